//! Cleanup entries registered on the innermost protected-call frame.

use std::fmt;

use crate::core::Runtime;

/// Deferred action executed only if the enclosing protected call fails.
pub(crate) struct Cleanup {
    handler: Box<dyn FnOnce(&Runtime)>,
}

impl Cleanup {
    pub(crate) fn new(handler: impl FnOnce(&Runtime) + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    pub(crate) fn run(self, rt: &Runtime) {
        (self.handler)(rt)
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}
