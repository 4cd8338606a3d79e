//! Slots: queued sinks delivered by pool workers and polls consumed by
//! dedicated threads.

mod poll;
mod slot;

pub(crate) use poll::Poll;
pub use slot::{Slot, SlotKind, SlotRef};
