//! # Delivered signal envelope.
//!
//! A [`Signal`] is what a handler (or a poll waiter) receives: the emitting
//! service, a 7-bit type tag, a session number and an optional owned payload.
//! It is immutable once queued.
//!
//! ## Payload terminator
//! Payloads emitted with copy semantics (borrowed bytes, see [`Message`](crate::Message))
//! are duplicated into owned storage followed by a single `\0`, so string payloads
//! stay printable. [`Signal::data`] hides the terminator, [`Signal::bytes_with_nul`]
//! exposes it.

use std::fmt;

use crate::services::ServiceRef;

/// Immutable message envelope delivered to a slot.
pub struct Signal {
    pub(crate) source: ServiceRef,
    pub(crate) kind: u8,
    pub(crate) session: u32,
    pub(crate) payload: Option<Vec<u8>>,
    pub(crate) terminated: bool,
}

impl Signal {
    /// Service that emitted this signal.
    pub fn source(&self) -> &ServiceRef {
        &self.source
    }

    /// Type tag (`0..=127`).
    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// Session number chosen by the emitter.
    pub fn session(&self) -> u32 {
        self.session
    }

    /// Payload bytes without the copy terminator, if any payload was attached.
    pub fn data(&self) -> Option<&[u8]> {
        let bytes = self.payload.as_deref()?;
        if self.terminated {
            Some(&bytes[..bytes.len().saturating_sub(1)])
        } else {
            Some(bytes)
        }
    }

    /// Payload bytes including the trailing `\0`; only set for copied payloads.
    pub fn bytes_with_nul(&self) -> Option<&[u8]> {
        if self.terminated {
            self.payload.as_deref()
        } else {
            None
        }
    }

    /// Payload decoded as UTF-8, terminator excluded.
    pub fn as_str(&self) -> Option<&str> {
        self.data().and_then(|d| std::str::from_utf8(d).ok())
    }

    /// `true` when the payload was duplicated at emit time.
    pub fn is_copied(&self) -> bool {
        self.terminated
    }

    /// Consumes the signal, returning the payload without the terminator.
    pub fn into_data(self) -> Option<Vec<u8>> {
        let mut bytes = self.payload?;
        if self.terminated {
            bytes.pop();
        }
        Some(bytes)
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("source", &self.source.name())
            .field("kind", &self.kind)
            .field("session", &self.session)
            .field("len", &self.data().map(<[u8]>::len))
            .field("copied", &self.terminated)
            .finish()
    }
}
