//! Signals: delivered envelopes, outgoing messages and pooled queue nodes.
//!
//! ## Contents
//! - [`Signal`] immutable envelope received by handlers and poll waiters
//! - [`Message`] builder describing a signal before emission
//! - `SignalNode` / `NodePool` (internal) queue nodes and their free list

mod message;
mod node;
mod signal;

pub use message::{MAX_KIND, MAX_PAYLOAD, Message};
pub(crate) use node::{NodePool, SignalNode, SignalQueue};
pub use signal::Signal;
