//! # Outgoing message builder.
//!
//! [`Message`] describes a signal before it is emitted. The payload ownership
//! decides the transfer semantics:
//!
//! - **Borrowed** bytes (`&[u8]`, `&str`) are copied into owned storage with a
//!   trailing `\0` before the emit call returns; the caller may reuse its buffer
//!   immediately.
//! - **Owned** bytes (`Vec<u8>`) are moved into the queue node as-is.
//!
//! ## Limits
//! - `kind` must fit into 7 bits (`0..=127`)
//! - payload length must fit into 24 bits (`< 16 MiB`)
//!
//! ## Example
//! ```rust
//! use slotvisor::Message;
//!
//! let msg = Message::new(1).with_session(7).with_str("hi");
//! assert_eq!(msg.kind(), 1);
//! assert_eq!(msg.session(), 7);
//! assert!(msg.is_copy());
//! ```

use std::borrow::Cow;

use crate::error::RuntimeError;
use crate::services::ServiceRef;

/// Largest accepted signal kind (7-bit tag).
pub const MAX_KIND: u8 = 0x7f;

/// Largest accepted payload size in bytes (24-bit size field).
pub const MAX_PAYLOAD: usize = (1 << 24) - 1;

/// Signal description handed to [`Runtime::emit`](crate::Runtime::emit).
#[derive(Debug, Clone, Default)]
pub struct Message<'a> {
    pub(crate) source: Option<ServiceRef>,
    pub(crate) kind: u8,
    pub(crate) session: u32,
    pub(crate) payload: Option<Cow<'a, [u8]>>,
}

impl<'a> Message<'a> {
    /// Creates a message with the given type tag and no payload.
    pub fn new(kind: u8) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Attaches a session number.
    #[inline]
    pub fn with_session(mut self, session: u32) -> Self {
        self.session = session;
        self
    }

    /// Attaches borrowed bytes; they are copied at emit time.
    #[inline]
    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.payload = Some(Cow::Borrowed(data));
        self
    }

    /// Attaches a borrowed string; it is copied at emit time.
    #[inline]
    pub fn with_str(self, s: &'a str) -> Self {
        self.with_data(s.as_bytes())
    }

    /// Moves an owned buffer into the signal without copying.
    #[inline]
    pub fn with_owned(mut self, data: Vec<u8>) -> Self {
        self.payload = Some(Cow::Owned(data));
        self
    }

    /// Overrides the source service (defaults to the emitting context's service).
    #[inline]
    pub fn with_source(mut self, source: ServiceRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Type tag.
    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// Session number.
    pub fn session(&self) -> u32 {
        self.session
    }

    /// `true` when the payload will be duplicated at emit time.
    pub fn is_copy(&self) -> bool {
        matches!(self.payload, Some(Cow::Borrowed(_)))
    }

    /// Checks the 7-bit kind and 24-bit size limits.
    pub(crate) fn validate(&self) -> Result<(), RuntimeError> {
        if self.kind > MAX_KIND {
            return Err(RuntimeError::InvalidKind { kind: self.kind });
        }
        let size = self.payload.as_ref().map_or(0, |p| p.len());
        if size > MAX_PAYLOAD {
            return Err(RuntimeError::PayloadTooLarge {
                size,
                max: MAX_PAYLOAD,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_payload_is_not_copied() {
        let msg = Message::new(3).with_owned(vec![1, 2, 3]);
        assert!(!msg.is_copy());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn kind_must_fit_seven_bits() {
        assert!(Message::new(MAX_KIND).validate().is_ok());
        assert_eq!(
            Message::new(128).validate(),
            Err(RuntimeError::InvalidKind { kind: 128 })
        );
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let big = vec![0u8; MAX_PAYLOAD + 1];
        let err = Message::new(0).with_data(&big).validate().unwrap_err();
        assert_eq!(err.as_label(), "runtime_payload_too_large");
    }
}
