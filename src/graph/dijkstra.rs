use std::cmp::Ordering;
use std::hash::Hash;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::{DirectedEdge, Length};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapElement<EdgeId> {
    /// Current smallest weight from origin up to (and including) this edge.
    pub weight: OrderedFloat<f64>,
    /// Length of the path from origin up to (and including) this edge.
    pub length: Length,
    pub edge: DirectedEdge<EdgeId>,
}

// The priority queue depends on the implementation of the Ord trait.
// By default std::BinaryHeap is a max heap.
// Explicitly implement the trait so the queue becomes a min heap.
impl<EdgeId: Ord> Ord for HeapElement<EdgeId> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            // breaking ties in a deterministic way
            .then_with(|| other.length.cmp(&self.length))
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

impl<EdgeId: Ord> PartialOrd for HeapElement<EdgeId> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Unpacks the shortest path from destination back to origin.
/// Edges are returned in the order the predecessor map was built: origin first.
pub fn unpack_path<EdgeId: Copy + Eq + Hash>(
    previous_edges: &FxHashMap<DirectedEdge<EdgeId>, DirectedEdge<EdgeId>>,
    destination: DirectedEdge<EdgeId>,
) -> Vec<DirectedEdge<EdgeId>> {
    let mut edges = vec![destination];
    let mut next = destination;

    while let Some(&e) = previous_edges.get(&next) {
        next = e;
        edges.push(e);
    }

    edges.reverse();
    edges
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    #[test]
    fn heap_element_min_heap() {
        let element = |weight: f64, id: u32| HeapElement {
            weight: OrderedFloat(weight),
            length: Length::from_meters(weight),
            edge: DirectedEdge::forward(id),
        };

        let mut heap = BinaryHeap::from([element(3.0, 1), element(1.0, 2), element(1.0, 0)]);

        assert_eq!(heap.pop().map(|e| e.edge.id), Some(0));
        assert_eq!(heap.pop().map(|e| e.edge.id), Some(2));
        assert_eq!(heap.pop().map(|e| e.edge.id), Some(1));
    }

    #[test]
    fn unpack_path_from_predecessors() {
        let e = DirectedEdge::forward;
        let previous = FxHashMap::from_iter([(e(3), e(2)), (e(2), e(1))]);

        assert_eq!(unpack_path(&previous, e(3)), vec![e(1), e(2), e(3)]);
        assert_eq!(unpack_path(&previous, e(1)), vec![e(1)]);
    }
}
