//! Solver worklist
//!
//! FIFO of newly derived edges. A second, deferred queue holds primary items
//! of transitive symbols when the hierarchical accelerator wants to batch
//! them; it is only drained once the main queue is empty.

use super::label::{Label, LabeledEdge, NodeId};
use std::collections::VecDeque;

/// `(src, dst, label, is_primary)`
///
/// Primary items still have to pass through accelerator logic; secondary
/// items announce pairs an accelerator already owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorklistItem {
    pub src: NodeId,
    pub dst: NodeId,
    pub label: Label,
    pub is_primary: bool,
}

impl WorklistItem {
    #[inline]
    pub const fn primary(src: NodeId, dst: NodeId, label: Label) -> Self {
        Self {
            src,
            dst,
            label,
            is_primary: true,
        }
    }

    #[inline]
    pub const fn secondary(src: NodeId, dst: NodeId, label: Label) -> Self {
        Self {
            src,
            dst,
            label,
            is_primary: false,
        }
    }

    pub fn edge(&self) -> LabeledEdge {
        LabeledEdge::new(self.src, self.dst, self.label)
    }
}

#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<WorklistItem>,
    deferred: VecDeque<WorklistItem>,
    pushed: u64,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, item: WorklistItem) {
        self.queue.push_back(item);
        self.pushed += 1;
    }

    /// Queue behind everything in the main queue
    #[inline]
    pub fn defer(&mut self, item: WorklistItem) {
        self.deferred.push_back(item);
        self.pushed += 1;
    }

    /// Next item, main queue first
    #[inline]
    pub fn pop(&mut self) -> Option<WorklistItem> {
        self.queue.pop_front().or_else(|| self.deferred.pop_front())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.deferred.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len() + self.deferred.len()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Items ever pushed (both queues)
    pub fn total_pushed(&self) -> u64 {
        self.pushed
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.deferred.clear();
        self.pushed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut wl = Worklist::new();
        for i in 0..3 {
            wl.push(WorklistItem::primary(i, i + 1, Label::plain(1)));
        }
        let srcs: Vec<NodeId> = std::iter::from_fn(|| wl.pop()).map(|it| it.src).collect();
        assert_eq!(srcs, vec![0, 1, 2]);
        assert!(wl.is_empty());
    }

    #[test]
    fn test_deferred_drained_last() {
        let mut wl = Worklist::new();
        wl.defer(WorklistItem::primary(9, 9, Label::plain(1)));
        wl.push(WorklistItem::secondary(1, 2, Label::plain(1)));
        assert_eq!(wl.len(), 2);
        assert_eq!(wl.deferred_len(), 1);

        assert_eq!(wl.pop().map(|i| i.src), Some(1));
        wl.push(WorklistItem::secondary(3, 4, Label::plain(1)));
        assert_eq!(wl.pop().map(|i| i.src), Some(3));
        assert_eq!(wl.pop().map(|i| i.is_primary), Some(true));
        assert_eq!(wl.pop(), None);
        assert_eq!(wl.total_pushed(), 3);
    }
}
