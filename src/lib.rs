#![allow(clippy::needless_range_loop)] // I want these loops!

pub mod graph;
pub mod prune;
pub mod reconstruct;
pub mod snapshot;
pub mod utils;

use num_traits::Float;

use crate::graph::*;
use crate::prune::*;
use crate::reconstruct::*;
use crate::snapshot::*;
use crate::utils::*;

/////////////
// Extract //
/////////////

/// Materialise a snapshot of the live graph
///
/// ### Params
///
/// * `graph` - The live graph to copy from
/// * `verbose` - Controls verbosity of the function
///
/// ### Returns
///
/// The `Snapshot`, holding the adjacency list of id `i` at index `i - 1`,
/// each list allocated at exactly its size. Unreadable ids leave an empty
/// entry behind a warning.
pub fn extract<T, G>(graph: &mut G, verbose: bool) -> Snapshot<T>
where
    T: Float,
    G: GraphView<T>,
{
    extract_graph(graph, verbose)
}

////////////////
// Symmetrise //
////////////////

/// Make a snapshot bidirectional
///
/// Adds the reverse of every edge with its distance mirrored verbatim,
/// then normalises each adjacency list. The input metric is assumed to be
/// symmetric.
///
/// ### Params
///
/// * `snapshot` - The snapshot to symmetrise in place
/// * `verbose` - Controls verbosity of the function
pub fn symmetrise<T>(snapshot: &mut Snapshot<T>, verbose: bool)
where
    T: Float,
{
    symmetrise_graph(snapshot, verbose)
}

/////////////////
// Reconstruct //
/////////////////

/// Replace the live graph with a capped out-degree rebuild plus reverse
/// edges
///
/// ### Params
///
/// * `snapshot` - The extracted snapshot to rebuild from
/// * `out` - The live graph to rebuild in place
/// * `forward_edge_size` - Forward edges kept per node
/// * `reverse_edge_size` - Reverse edge candidates taken per source node,
///   at most `10_000`
/// * `verbose` - Controls verbosity of the function
///
/// ### Returns
///
/// `Ok(())`, or an error when the reverse edge budget exceeds the
/// supported maximum.
pub fn reconstruct<T, G>(
    snapshot: &Snapshot<T>,
    out: &mut G,
    forward_edge_size: usize,
    reverse_edge_size: usize,
    verbose: bool,
) -> Result<(), GraphError>
where
    T: Float,
    G: GraphView<T>,
{
    reconstruct_graph(snapshot, out, forward_edge_size, reverse_edge_size, verbose)
}

/// Replace the live graph with an in-degree bounded rebuild
///
/// Reverse edges are handed out in ascending reverse-degree order so that
/// nodes with few candidates are served first, and no node receives more
/// than `reverse_edge_size` of them. The forward top-up honours the mode.
///
/// ### Params
///
/// * `snapshot` - The extracted snapshot to rebuild from
/// * `out` - The live graph to rebuild in place
/// * `forward_edge_size` - Forward edge budget per node
/// * `reverse_edge_size` - In-degree bound for the reverse edges, at most
///   `10_000`
/// * `mode` - One of `"a"`/`"additive"` (cap the final out-degree at the
///   forward budget) or `"c"`/`"cumulative"` (always add the full forward
///   budget). Unknown strings fall back to additive.
/// * `verbose` - Controls verbosity of the function
///
/// ### Returns
///
/// `Ok(())`, or an error when the reverse edge budget exceeds the
/// supported maximum.
pub fn reconstruct_constrained<T, G>(
    snapshot: &Snapshot<T>,
    out: &mut G,
    forward_edge_size: usize,
    reverse_edge_size: usize,
    mode: &str,
    verbose: bool,
) -> Result<(), GraphError>
where
    T: Float,
    G: GraphView<T>,
{
    let mode = parse_reconstruction_mode(mode).unwrap_or_default();
    reconstruct_graph_with_constraint(
        snapshot,
        out,
        forward_edge_size,
        reverse_edge_size,
        mode,
        verbose,
    )
}

/////////////
// Pruning //
/////////////

/// Remove shortcut-redundant edges from the live graph
///
/// The effective variant: candidate removals are enumerated in one
/// parallel pass, then committed rank by rank so that every removal is
/// justified by a two-hop path that itself survives the pruning.
///
/// ### Params
///
/// * `out` - The live graph to prune in place; adjacency lists must be
///   sorted by ascending distance
/// * `verbose` - Controls verbosity of the function
///
/// ### Returns
///
/// `Ok(())`, or an error when the commit uncovers a corrupt input
/// ordering.
pub fn prune_paths<T, G>(out: &mut G, verbose: bool) -> Result<(), GraphError>
where
    T: Float + Send + Sync,
    G: GraphView<T>,
{
    prune_shortcut_edges(out, verbose)
}

/// Remove shortcut-redundant edges, reference variant
///
/// Serial and cache-free; equivalent to `prune_paths` on well-formed
/// input and kept as the oracle for tests.
///
/// ### Params
///
/// * `out` - The live graph to prune in place; adjacency lists must be
///   sorted by ascending distance
/// * `verbose` - Controls verbosity of the function
pub fn prune_paths_simple<T, G>(out: &mut G, verbose: bool) -> Result<(), GraphError>
where
    T: Float + Send + Sync,
    G: GraphView<T>,
{
    prune_shortcut_edges_simple(out, verbose)
}
