use num_traits::Float;
use thiserror::Error;
use thousands::*;

use crate::utils::OrderedFloat;

///////////
// Types //
///////////

/// Identifier of an object stored in the index repository.
///
/// Ids are dense and start at 1. The value `0` is reserved and means "no
/// object". A repository of size `n + 1` holds the valid ids `1..=n`.
pub type ObjectId = u32;

/// A directed edge from the owning node to `id`, with its precomputed
/// distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour<T> {
    pub id: ObjectId,
    pub distance: T,
}

impl<T: Float> Neighbour<T> {
    #[inline(always)]
    pub fn new(id: ObjectId, distance: T) -> Self {
        Self { id, distance }
    }
}

/// The outgoing edges of one node.
///
/// After normalisation the list is sorted by `(distance, id)` ascending,
/// holds each target at most once and allocates no slack capacity.
pub type AdjacencyList<T> = Vec<Neighbour<T>>;

/// An in-memory copy of all adjacency lists, indexed by `id - 1`.
pub type Snapshot<T> = Vec<AdjacencyList<T>>;

////////////
// Errors //
////////////

/// Errors raised by graph access and the reconstruction operations
#[derive(Debug, Error)]
pub enum GraphError {
    /// The repository holds no node under this id
    #[error("no node with id {0} in the repository")]
    MissingNode(ObjectId),
    /// The caller asked for more reverse edges than the core supports
    #[error("reverse edge size {got} exceeds the supported maximum of {max}")]
    ReverseEdgeSize { got: usize, max: usize },
    /// Removal candidates survived past the end of a node's edge list
    #[error("{remaining} removal candidates left for id {id} after its edges were exhausted")]
    RemainingCandidates { id: ObjectId, remaining: usize },
}

///////////////
// GraphView //
///////////////

/// Capability interface onto the live proximity graph
///
/// The reconstruction core mutates the index's graph exclusively through
/// this trait. The external index owns the storage; the core only needs to
/// read the repository size, borrow adjacency lists and append edges.
pub trait GraphView<T> {
    /// One past the largest valid id
    fn size(&self) -> usize;

    /// Mutable access to the adjacency list of `id`
    ///
    /// ### Params
    ///
    /// * `id` - The node to look up
    ///
    /// ### Returns
    ///
    /// The node's edges, or `GraphError::MissingNode` for invalid or
    /// missing ids.
    fn node(&mut self, id: ObjectId) -> Result<&mut AdjacencyList<T>, GraphError>;

    /// Insert an edge `src -> target` at its sorted position
    ///
    /// ### Params
    ///
    /// * `src` - Source node id
    /// * `target` - Target node id
    /// * `distance` - Precomputed distance between the two objects
    /// * `check` - With `true`, an edge to an already present target is
    ///   skipped. With `false`, the existence check is skipped and
    ///   duplicates are possible.
    fn add_edge(
        &mut self,
        src: ObjectId,
        target: ObjectId,
        distance: T,
        check: bool,
    ) -> Result<(), GraphError>;

    /// Diagnostic hook, informational only
    fn show_statistics(&self) {}
}

//////////////
// VecGraph //
//////////////

/// Dense in-memory graph backed by a `Vec` of adjacency lists
///
/// Reference implementation of `GraphView` used by the tests and available
/// to callers without their own index storage. Node ids are `1..=n`.
pub struct VecGraph<T> {
    nodes: Vec<AdjacencyList<T>>,
}

impl<T: Float> VecGraph<T> {
    /// Create a graph of `n` nodes without any edges
    pub fn new(n: usize) -> Self {
        Self {
            nodes: vec![Vec::new(); n],
        }
    }

    /// Create a graph from existing adjacency lists
    ///
    /// ### Params
    ///
    /// * `lists` - Adjacency lists, entry `i` holding the edges of id
    ///   `i + 1`
    pub fn from_lists(lists: Vec<AdjacencyList<T>>) -> Self {
        Self { nodes: lists }
    }

    /// All adjacency lists, entry `i` holding the edges of id `i + 1`
    pub fn lists(&self) -> &[AdjacencyList<T>] {
        &self.nodes
    }
}

impl<T: Float> GraphView<T> for VecGraph<T> {
    fn size(&self) -> usize {
        self.nodes.len() + 1
    }

    fn node(&mut self, id: ObjectId) -> Result<&mut AdjacencyList<T>, GraphError> {
        if id == 0 || id as usize > self.nodes.len() {
            return Err(GraphError::MissingNode(id));
        }
        Ok(&mut self.nodes[(id - 1) as usize])
    }

    fn add_edge(
        &mut self,
        src: ObjectId,
        target: ObjectId,
        distance: T,
        check: bool,
    ) -> Result<(), GraphError> {
        let node = self.node(src)?;
        if check && node.iter().any(|e| e.id == target) {
            return Ok(());
        }
        let key = (OrderedFloat(distance), target);
        let pos = node.partition_point(|e| (OrderedFloat(e.distance), e.id) < key);
        node.insert(pos, Neighbour::new(target, distance));
        Ok(())
    }

    fn show_statistics(&self) {
        let n = self.nodes.len();
        let total: usize = self.nodes.iter().map(|node| node.len()).sum();
        let min = self.nodes.iter().map(|node| node.len()).min().unwrap_or(0);
        let max = self.nodes.iter().map(|node| node.len()).max().unwrap_or(0);
        let mean = total as f64 / n.max(1) as f64;
        println!(
            "# of nodes={} # of edges={} out-degree min={} max={} mean={:.2}",
            n.separate_with_underscores(),
            total.separate_with_underscores(),
            min,
            max,
            mean
        );
    }
}

///////////
// Tests //
///////////
