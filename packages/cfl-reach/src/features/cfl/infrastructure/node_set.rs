//! Sparse node set
//!
//! The per-`(node, label)` target set of the adjacency dataset. Sorted vector
//! with a small unsorted pending buffer:
//! - **Insert**: O(1) amortized, pending flushed every `PENDING_BUFFER_THRESHOLD` inserts
//! - **Contains**: O(log n) + O(pending)
//! - **Bulk union**: O(n + m) merge that reports exactly the newly added elements
//!
//! Invariant: `pending` is disjoint from `elements` and free of duplicates,
//! so `len()` never has to recount.

use super::super::domain::label::NodeId;
use std::cmp::Ordering;
use std::fmt;

/// Flush the pending buffer once it reaches this size
const PENDING_BUFFER_THRESHOLD: usize = 16;

/// Set of node ids
#[derive(Clone, Default)]
pub struct NodeSet {
    /// Sorted, deduplicated
    elements: Vec<NodeId>,
    /// Unsorted recent inserts, disjoint from `elements`
    pending: Vec<NodeId>,
}

impl NodeSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn singleton(node: NodeId) -> Self {
        Self {
            elements: vec![node],
            pending: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Consolidation
    // ═══════════════════════════════════════════════════════════════════════

    fn consolidate(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.pending.sort_unstable();
        if self.elements.is_empty() {
            std::mem::swap(&mut self.elements, &mut self.pending);
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        self.elements = merge_sorted(&self.elements, &pending);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Basic Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a node. Returns true if it was absent.
    #[inline]
    pub fn insert(&mut self, node: NodeId) -> bool {
        if self.contains(node) {
            return false;
        }
        self.pending.push(node);
        if self.pending.len() >= PENDING_BUFFER_THRESHOLD {
            self.consolidate();
        }
        true
    }

    /// Remove a node. Returns true if it was present.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if let Some(pos) = self.pending.iter().position(|&p| p == node) {
            self.pending.swap_remove(pos);
            return true;
        }
        match self.elements.binary_search(&node) {
            Ok(pos) => {
                self.elements.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.pending.contains(&node) || self.elements.binary_search(&node).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len() + self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.pending.clear();
    }

    /// Ascending iteration without mutating the set
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        MergedIterator::new(&self.elements, &self.pending)
    }

    /// Ascending snapshot
    pub fn to_vec(&self) -> Vec<NodeId> {
        self.iter().collect()
    }

    /// Smallest element
    pub fn first(&self) -> Option<NodeId> {
        let sorted = self.elements.first().copied();
        let pending = self.pending.iter().copied().min();
        match (sorted, pending) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Set Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// self ∪= other, returning exactly the elements that were not present
    pub fn union_new(&mut self, other: &NodeSet) -> NodeSet {
        if other.is_empty() {
            return NodeSet::new();
        }
        self.consolidate();
        let theirs = other.sorted();

        let mut merged = Vec::with_capacity(self.elements.len() + theirs.len());
        let mut added = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.elements.len() && j < theirs.len() {
            match self.elements[i].cmp(&theirs[j]) {
                Ordering::Less => {
                    merged.push(self.elements[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(theirs[j]);
                    added.push(theirs[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push(self.elements[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.elements[i..]);
        merged.extend_from_slice(&theirs[j..]);
        added.extend_from_slice(&theirs[j..]);

        self.elements = merged;
        NodeSet {
            elements: added,
            pending: Vec::new(),
        }
    }

    /// self ∪= other
    pub fn union_with(&mut self, other: &NodeSet) {
        self.union_new(other);
    }

    /// Elements of self not in other
    pub fn difference(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            elements: self.iter().filter(|&n| !other.contains(n)).collect(),
            pending: Vec::new(),
        }
    }

    /// Sorted copy of all elements
    fn sorted(&self) -> std::borrow::Cow<'_, [NodeId]> {
        if self.pending.is_empty() {
            std::borrow::Cow::Borrowed(&self.elements)
        } else {
            std::borrow::Cow::Owned(self.to_vec())
        }
    }
}

fn merge_sorted(a: &[NodeId], b: &[NodeId]) -> Vec<NodeId> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut elements: Vec<NodeId> = iter.into_iter().collect();
        elements.sort_unstable();
        elements.dedup();
        Self {
            elements,
            pending: Vec::new(),
        }
    }
}

impl Extend<NodeId> for NodeSet {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        for node in iter {
            self.insert(node);
        }
    }
}

impl PartialEq for NodeSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for NodeSet {}

impl fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending merge of the sorted storage and the (disjoint) pending buffer
struct MergedIterator<'a> {
    sorted: std::iter::Peekable<std::slice::Iter<'a, NodeId>>,
    pending: std::iter::Peekable<std::vec::IntoIter<NodeId>>,
}

impl<'a> MergedIterator<'a> {
    fn new(sorted: &'a [NodeId], pending: &[NodeId]) -> Self {
        let mut pending_sorted = pending.to_vec();
        pending_sorted.sort_unstable();
        Self {
            sorted: sorted.iter().peekable(),
            pending: pending_sorted.into_iter().peekable(),
        }
    }
}

impl Iterator for MergedIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        match (self.sorted.peek(), self.pending.peek()) {
            (Some(&&s), Some(&p)) if s < p => self.sorted.next().copied(),
            (Some(_), Some(_)) => self.pending.next(),
            (Some(_), None) => self.sorted.next().copied(),
            (None, _) => self.pending.next(),
        }
    }
}
