use num_traits::Float;
use std::time::Instant;
use thousands::*;

use crate::graph::*;
use crate::utils::*;

/// Hard cap on the reverse edge budget, guards against caller misuse
pub const MAX_REVERSE_EDGE_SIZE: usize = 10_000;

/// Normalise every adjacency list of the live graph
fn normalise_graph<T, G>(out: &mut G, context: &str, verbose: bool)
where
    T: Float,
    G: GraphView<T>,
{
    for id in 1..out.size() {
        if verbose && id.is_multiple_of(100_000) {
            println!(" Normalised {} nodes.", id.separate_with_underscores());
        }
        match out.node(id as ObjectId) {
            Ok(node) => normalise_edges(node),
            Err(err) => {
                eprintln!("{}: warning. Cannot get node {}: {}", context, id, err);
            }
        }
    }
}

/////////////////
// Reconstruct //
/////////////////

/// Rebuild the live graph from a snapshot with capped out-degree plus
/// reverse edges
///
/// Three phases run in order. The forward phase replaces every adjacency
/// list with the first `forward_edge_size` snapshot edges. The reverse
/// phase appends, for each of the first `reverse_edge_size` snapshot edges
/// `i -> j`, the edge `j -> i` with the mirrored distance (symmetric input
/// metric presumed). The normalisation phase sorts, deduplicates and
/// compacts every list.
///
/// ### Params
///
/// * `snapshot` - The extracted snapshot to rebuild from
/// * `out` - The live graph to rebuild in place
/// * `forward_edge_size` - Forward edges kept per node; `0` clears the
///   lists before the reverse phase
/// * `reverse_edge_size` - Reverse edge candidates taken per source node
/// * `verbose` - Print progress and timing information
///
/// ### Returns
///
/// `Ok(())`, or `GraphError::ReverseEdgeSize` when `reverse_edge_size`
/// exceeds the supported maximum.
pub fn reconstruct_graph<T, G>(
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
    if reverse_edge_size > MAX_REVERSE_EDGE_SIZE {
        return Err(GraphError::ReverseEdgeSize {
            got: reverse_edge_size,
            max: MAX_REVERSE_EDGE_SIZE,
        });
    }

    let start_forward = Instant::now();
    for id in 1..out.size() {
        let node = match out.node(id as ObjectId) {
            Ok(node) => node,
            Err(err) => {
                eprintln!("reconstruct_graph: warning. Cannot get node {}: {}", id, err);
                continue;
            }
        };
        if forward_edge_size == 0 {
            *node = Vec::new();
        } else {
            let source = &snapshot[id - 1];
            if source.len() < forward_edge_size {
                eprintln!(
                    "reconstruct_graph: warning. Node {} has only {} edges, {} requested.",
                    id,
                    source.len(),
                    forward_edge_size
                );
                continue;
            }
            *node = source[..forward_edge_size].to_vec();
        }
    }
    let forward_time = start_forward.elapsed();

    let start_reverse = Instant::now();
    let mut insufficient_nodes = 0usize;
    for id in 1..=snapshot.len() {
        let source = &snapshot[id - 1];
        let mut rsize = reverse_edge_size;
        if rsize > source.len() {
            insufficient_nodes += 1;
            rsize = source.len();
        }
        for edge in &source[..rsize] {
            // the external graph may reject unknown target ids
            if let Ok(node) = out.node(edge.id) {
                node.push(Neighbour::new(id as ObjectId, edge.distance));
            }
        }
    }
    let reverse_time = start_reverse.elapsed();
    if insufficient_nodes != 0 {
        eprintln!(
            "reconstruct_graph: {} nodes had fewer than {} edges for the reverse phase.",
            insufficient_nodes.separate_with_underscores(),
            reverse_edge_size
        );
    }

    let start_normalise = Instant::now();
    normalise_graph(out, "reconstruct_graph", verbose);
    let normalise_time = start_normalise.elapsed();

    if verbose {
        println!(
            "Reconstructed the graph in {:.2?} (forward), {:.2?} (reverse), {:.2?} (normalise).",
            forward_time, reverse_time, normalise_time
        );
        println!(
            "forward edge size={} reverse edge size={}",
            forward_edge_size, reverse_edge_size
        );
    }

    Ok(())
}

/////////////////////////////
// Constrained reconstruct //
/////////////////////////////

/// Rebuild the live graph with bounded in-degree and reverse-degree
/// fairness
///
/// All lists are cleared first. Reverse candidates are accumulated per
/// target, then sources are processed in ascending reverse-degree order so
/// nodes with few candidates are not starved by popular ones. A reverse
/// edge `rid -> u` is emitted only while `u` has received fewer than
/// `reverse_edge_size` reverse edges, and only if `u` has none yet or
/// `rid`'s list is still below `forward_edge_size`. After normalisation
/// the original forward edges are topped up through
/// `GraphView::add_edge`; `Additive` mode stops once a node's out-degree
/// reaches `forward_edge_size`, `Cumulative` mode adds the full forward
/// budget regardless.
///
/// ### Params
///
/// * `snapshot` - The extracted snapshot to rebuild from
/// * `out` - The live graph to rebuild in place
/// * `forward_edge_size` - Forward edge budget per node
/// * `reverse_edge_size` - In-degree bound for emitted reverse edges
/// * `mode` - `Additive` or `Cumulative` top-up behaviour
/// * `verbose` - Print progress, statistics and timing information
///
/// ### Returns
///
/// `Ok(())`, or `GraphError::ReverseEdgeSize` when `reverse_edge_size`
/// exceeds the supported maximum.
pub fn reconstruct_graph_with_constraint<T, G>(
    snapshot: &Snapshot<T>,
    out: &mut G,
    forward_edge_size: usize,
    reverse_edge_size: usize,
    mode: ReconstructionMode,
    verbose: bool,
) -> Result<(), GraphError>
where
    T: Float,
    G: GraphView<T>,
{
    if reverse_edge_size > MAX_REVERSE_EDGE_SIZE {
        return Err(GraphError::ReverseEdgeSize {
            got: reverse_edge_size,
            max: MAX_REVERSE_EDGE_SIZE,
        });
    }

    for id in 1..out.size() {
        if verbose && id.is_multiple_of(1_000_000) {
            println!(" Cleared {} nodes.", id.separate_with_underscores());
        }
        match out.node(id as ObjectId) {
            Ok(node) => {
                if node.is_empty() {
                    continue;
                }
                *node = Vec::new();
            }
            Err(err) => {
                eprintln!(
                    "reconstruct_graph_with_constraint: warning. Cannot get node {}: {}",
                    id, err
                );
            }
        }
    }
    if verbose {
        out.show_statistics();
    }

    let start_reverse = Instant::now();
    let mut reverse: Vec<AdjacencyList<T>> = vec![Vec::new(); snapshot.len() + 1];
    for id in 1..=snapshot.len() {
        if verbose && id.is_multiple_of(100_000) {
            println!(" Summed up {} nodes.", id.separate_with_underscores());
        }
        for edge in &snapshot[id - 1] {
            reverse[edge.id as usize].push(Neighbour::new(id as ObjectId, edge.distance));
        }
    }

    // nodes with the fewest reverse candidates pick first
    let mut reverse_size: Vec<(usize, usize)> = (1..=snapshot.len())
        .map(|rid| (reverse[rid].len(), rid))
        .collect();
    reverse_size.sort_unstable();

    let mut indegree = vec![0u32; snapshot.len() + 1];
    let mut zero_nodes = 0usize;
    for &(rsize, rid) in &reverse_size {
        if rsize == 0 {
            zero_nodes += 1;
            continue;
        }
        for rni in 0..reverse[rid].len() {
            let edge = reverse[rid][rni];
            if indegree[edge.id as usize] >= reverse_edge_size as u32 {
                continue;
            }
            let node = match out.node(rid as ObjectId) {
                Ok(node) => node,
                Err(err) => {
                    eprintln!(
                        "reconstruct_graph_with_constraint: warning. Cannot get node {}: {}",
                        rid, err
                    );
                    break;
                }
            };
            if indegree[edge.id as usize] > 0 && node.len() >= forward_edge_size {
                continue;
            }
            node.push(edge);
            indegree[edge.id as usize] += 1;
        }
    }
    let reverse_time = start_reverse.elapsed();
    if verbose {
        println!(
            "# of nodes without any reverse edge={}",
            zero_nodes.separate_with_underscores()
        );
        out.show_statistics();
    }

    let start_normalise = Instant::now();
    normalise_graph(out, "reconstruct_graph_with_constraint", verbose);
    let normalise_time = start_normalise.elapsed();
    if verbose {
        out.show_statistics();
    }

    let start_forward = Instant::now();
    for id in 1..out.size() {
        if verbose && id.is_multiple_of(1_000_000) {
            println!(" Topped up {} nodes.", id.separate_with_underscores());
        }
        let source = &snapshot[id - 1];
        let limit = source.len().min(forward_edge_size);
        for edge in &source[..limit] {
            if mode == ReconstructionMode::Additive {
                match out.node(id as ObjectId) {
                    Ok(node) => {
                        if node.len() >= forward_edge_size {
                            break;
                        }
                    }
                    Err(err) => {
                        eprintln!(
                            "reconstruct_graph_with_constraint: warning. Cannot get node {}: {}",
                            id, err
                        );
                        break;
                    }
                }
            }
            if let Err(err) = out.add_edge(id as ObjectId, edge.id, edge.distance, false) {
                eprintln!(
                    "reconstruct_graph_with_constraint: warning. Cannot add edge {} -> {}: {}",
                    id, edge.id, err
                );
                break;
            }
        }
    }
    let forward_time = start_forward.elapsed();
    if verbose {
        out.show_statistics();
        println!(
            "Reconstructed the graph in {:.2?} (forward), {:.2?} (reverse), {:.2?} (normalise).",
            forward_time, reverse_time, normalise_time
        );
        println!(
            "forward edge size={} reverse edge size={}",
            forward_edge_size, reverse_edge_size
        );
    }

    Ok(())
}

///////////
// Tests //
///////////
