//! Execution context: thread-local protected-call frames and cleanup stacks.
//!
//! The public surface lives on [`Runtime`](crate::Runtime):
//! [`pcall`](crate::Runtime::pcall), [`discard`](crate::Runtime::discard),
//! [`add_cleanup`](crate::Runtime::add_cleanup) and
//! [`current`](crate::Runtime::current).

mod cleanup;
mod frame;

pub(crate) use cleanup::Cleanup;
pub(crate) use frame::{current, is_protected, protect, push_cleanup};
