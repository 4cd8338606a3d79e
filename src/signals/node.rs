//! # Pooled queue nodes.
//!
//! Every queued signal travels inside a boxed [`SignalNode`] together with its
//! target slot. Delivered nodes are returned to a [`NodePool`] guarded by the
//! runtime's global lock instead of being deallocated; a recycled node also keeps
//! its payload buffer so the next copied payload can reuse the allocation.
//!
//! ## Ownership
//! A node is owned by exactly one of: the emitting producer (momentarily), a
//! service or poll queue, the pool, or the worker currently delivering it.
//! Moving a `Box<SignalNode>` between these places keeps that invariant
//! structural.

use std::borrow::Cow;
use std::collections::VecDeque;

use crate::services::ServiceRef;
use crate::signals::{Message, Signal};
use crate::slots::SlotRef;

/// Recycled buffers larger than this are released instead of kept.
const MAX_SPARE_CAPACITY: usize = 64 * 1024;

/// FIFO of pending nodes; `mem::take` detaches the whole batch in O(1).
pub(crate) type SignalQueue = VecDeque<Box<SignalNode>>;

/// One queued signal plus its target slot.
#[derive(Default)]
pub(crate) struct SignalNode {
    pub(crate) slot: Option<SlotRef>,
    pub(crate) signal: Option<Signal>,
    spare: Vec<u8>,
}

impl SignalNode {
    /// Loads a message into this node, copying borrowed payloads (plus `\0`)
    /// into the recycled buffer.
    pub(crate) fn fill(&mut self, slot: SlotRef, source: ServiceRef, msg: Message<'_>) {
        let (payload, terminated) = match msg.payload {
            None => (None, false),
            Some(Cow::Borrowed(bytes)) => {
                let mut buf = std::mem::take(&mut self.spare);
                buf.clear();
                buf.reserve(bytes.len() + 1);
                buf.extend_from_slice(bytes);
                buf.push(0);
                (Some(buf), true)
            }
            Some(Cow::Owned(bytes)) => (Some(bytes), false),
        };
        self.slot = Some(slot);
        self.signal = Some(Signal {
            source,
            kind: msg.kind,
            session: msg.session,
            payload,
            terminated,
        });
    }

    /// Source service of the carried signal.
    pub(crate) fn source(&self) -> Option<&ServiceRef> {
        self.signal.as_ref().map(Signal::source)
    }

    /// Drops the slot/source references and keeps the payload buffer for reuse.
    pub(crate) fn recycle(&mut self) {
        self.slot = None;
        if let Some(signal) = self.signal.take() {
            if let Some(mut buf) = signal.payload {
                if buf.capacity() <= MAX_SPARE_CAPACITY && buf.capacity() > self.spare.capacity()
                {
                    buf.clear();
                    self.spare = buf;
                }
            }
        }
    }
}

/// Free list of recycled nodes.
pub(crate) struct NodePool {
    free: Vec<Box<SignalNode>>,
    capacity: usize,
}

impl NodePool {
    /// Creates a pool that keeps at most `capacity` idle nodes.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// Pops a recycled node or allocates a fresh one.
    pub(crate) fn take(&mut self) -> Box<SignalNode> {
        self.free.pop().unwrap_or_default()
    }

    /// Returns one node to the free list.
    pub(crate) fn put(&mut self, mut node: Box<SignalNode>) {
        node.recycle();
        if self.free.len() < self.capacity {
            self.free.push(node);
        }
    }

    /// Returns a batch of already recycled nodes.
    pub(crate) fn absorb(&mut self, nodes: Vec<Box<SignalNode>>) {
        let room = self.capacity.saturating_sub(self.free.len());
        self.free.extend(nodes.into_iter().take(room));
    }

    /// Number of idle nodes.
    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.free.len()
    }

    /// Drops every idle node.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_respects_capacity() {
        let mut pool = NodePool::new(2);
        for _ in 0..4 {
            pool.put(Box::default());
        }
        assert_eq!(pool.idle(), 2);

        pool.absorb(vec![Box::default(), Box::default()]);
        assert_eq!(pool.idle(), 2);

        let _node = pool.take();
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn take_allocates_when_empty() {
        let mut pool = NodePool::new(0);
        let node = pool.take();
        assert!(node.slot.is_none());
        assert!(node.signal.is_none());
        pool.put(node);
        assert_eq!(pool.idle(), 0);
    }
}
