use num_traits::Float;
use rustc_hash::FxHashSet;

use crate::graph::AdjacencyList;

///////////////////
// Float on heap //
///////////////////

/// Wrapper for floats that implements Ord for sorting and heap use
#[derive(Clone, Copy, Debug)]
pub struct OrderedFloat<T>(pub T);

/// Partial equality trait
impl<T: Float> PartialEq for OrderedFloat<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Equality trait
impl<T: Float> Eq for OrderedFloat<T> {}

/// Partial ordering trait
impl<T: Float> PartialOrd for OrderedFloat<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Comparing one to the other
impl<T: Float> Ord for OrderedFloat<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

///////////////////
// Normalisation //
///////////////////

/// Bring an adjacency list into canonical form
///
/// Sorts by `(distance, id)` ascending, removes duplicate targets keeping
/// the first (closest) occurrence and releases any slack capacity.
///
/// ### Params
///
/// * `edges` - The adjacency list to normalise in place
pub fn normalise_edges<T: Float>(edges: &mut AdjacencyList<T>) {
    edges.sort_unstable_by_key(|e| (OrderedFloat(e.distance), e.id));
    let mut seen = FxHashSet::default();
    edges.retain(|e| seen.insert(e.id));
    edges.shrink_to_fit();
}

/////////////////////////
// Reconstruction mode //
/////////////////////////

/// How the forward top-up of the constrained reconstruction treats the
/// out-degree budget
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ReconstructionMode {
    /// Cap the final out-degree at the forward edge budget, counting the
    /// reverse edges already present
    #[default]
    Additive,
    /// Add the full forward edge budget regardless of present edges
    Cumulative,
}

/// Parsing the constrained reconstruction mode
///
/// Accepts the single-letter forms used by the original index tooling as
/// well as the spelled out names.
///
/// ### Params
///
/// * `s` - The string that defines the mode
///
/// ### Results
///
/// The `ReconstructionMode`, or `None` for unknown strings.
pub fn parse_reconstruction_mode(s: &str) -> Option<ReconstructionMode> {
    match s.to_lowercase().as_str() {
        "a" | "additive" => Some(ReconstructionMode::Additive),
        "c" | "cumulative" => Some(ReconstructionMode::Cumulative),
        _ => None,
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Neighbour;
    use std::cmp::{Ordering, Reverse};
    use std::collections::BinaryHeap;

    #[test]
    fn test_parse_reconstruction_mode_additive() {
        assert_eq!(
            parse_reconstruction_mode("a"),
            Some(ReconstructionMode::Additive)
        );
        assert_eq!(
            parse_reconstruction_mode("additive"),
            Some(ReconstructionMode::Additive)
        );
        assert_eq!(
            parse_reconstruction_mode("Additive"),
            Some(ReconstructionMode::Additive)
        );
    }

    #[test]
    fn test_parse_reconstruction_mode_cumulative() {
        assert_eq!(
            parse_reconstruction_mode("c"),
            Some(ReconstructionMode::Cumulative)
        );
        assert_eq!(
            parse_reconstruction_mode("CUMULATIVE"),
            Some(ReconstructionMode::Cumulative)
        );
    }

    #[test]
    fn test_parse_reconstruction_mode_invalid() {
        assert_eq!(parse_reconstruction_mode("b"), None);
        assert_eq!(parse_reconstruction_mode(""), None);
        assert_eq!(parse_reconstruction_mode(" a"), None); // Leading space
    }

    #[test]
    fn test_normalise_edges_sorts_by_distance() {
        let mut edges = vec![
            Neighbour::new(3, 0.9),
            Neighbour::new(1, 0.2),
            Neighbour::new(2, 0.5),
        ];
        normalise_edges(&mut edges);

        assert_eq!(edges[0].id, 1);
        assert_eq!(edges[1].id, 2);
        assert_eq!(edges[2].id, 3);
    }

    #[test]
    fn test_normalise_edges_ties_broken_by_id() {
        let mut edges = vec![Neighbour::new(5, 0.5), Neighbour::new(2, 0.5)];
        normalise_edges(&mut edges);

        assert_eq!(edges[0].id, 2);
        assert_eq!(edges[1].id, 5);
    }

    #[test]
    fn test_normalise_edges_dedup_keeps_closest() {
        let mut edges = vec![
            Neighbour::new(2, 0.8),
            Neighbour::new(2, 0.3),
            Neighbour::new(4, 0.5),
        ];
        normalise_edges(&mut edges);

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], Neighbour::new(2, 0.3));
        assert_eq!(edges[1], Neighbour::new(4, 0.5));
    }

    #[test]
    fn test_normalise_edges_exact_capacity() {
        let mut edges = Vec::with_capacity(64);
        edges.push(Neighbour::new(2, 0.8));
        edges.push(Neighbour::new(2, 0.3));
        normalise_edges(&mut edges);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges.capacity(), edges.len());
    }

    #[test]
    fn test_normalise_edges_empty() {
        let mut edges: Vec<Neighbour<f64>> = Vec::new();
        normalise_edges(&mut edges);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_ordered_float_ordering() {
        let a = OrderedFloat(1.0_f32);
        let b = OrderedFloat(2.0_f32);
        let c = OrderedFloat(1.0_f32);

        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(b.cmp(&a), Ordering::Greater);
        assert_eq!(a.cmp(&c), Ordering::Equal);
    }

    #[test]
    fn test_ordered_float_in_reverse_binary_heap() {
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(OrderedFloat(3.0_f32)));
        heap.push(Reverse(OrderedFloat(1.0_f32)));
        heap.push(Reverse(OrderedFloat(2.0_f32)));

        // reverse makes it a min-heap, should pop in ascending order
        assert_eq!(heap.pop(), Some(Reverse(OrderedFloat(1.0))));
        assert_eq!(heap.pop(), Some(Reverse(OrderedFloat(2.0))));
        assert_eq!(heap.pop(), Some(Reverse(OrderedFloat(3.0))));
    }

    #[test]
    fn test_ordered_float_nan_handling() {
        let a = OrderedFloat(1.0_f32);
        let nan = OrderedFloat(f32::NAN);

        // NaN comparisons fall back to Equal
        assert_eq!(nan.cmp(&nan), Ordering::Equal);
        assert_eq!(a.cmp(&nan), Ordering::Equal);
    }
}
