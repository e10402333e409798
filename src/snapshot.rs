use num_traits::Float;
use std::time::Instant;
use thousands::*;

use crate::graph::*;
use crate::utils::*;

/////////////
// Extract //
/////////////

/// Materialise a snapshot of the live graph's adjacency
///
/// Copies every adjacency list into an independent, heap-allocated
/// `Snapshot` with exactly the required capacity per list. Ids that cannot
/// be read leave an empty entry behind a warning.
///
/// ### Params
///
/// * `graph` - The live graph to copy from
/// * `verbose` - Print progress and timing information
///
/// ### Returns
///
/// The `Snapshot`, with the list for id `i` stored at index `i - 1`.
pub fn extract_graph<T, G>(graph: &mut G, verbose: bool) -> Snapshot<T>
where
    T: Float,
    G: GraphView<T>,
{
    let start = Instant::now();
    let size = graph.size();
    let n = size.saturating_sub(1);

    let mut snapshot: Snapshot<T> = Vec::with_capacity(n);
    for id in 1..size {
        if verbose && id.is_multiple_of(1_000_000) {
            println!(
                " Extracted {} / {} nodes.",
                id.separate_with_underscores(),
                n.separate_with_underscores()
            );
        }
        match graph.node(id as ObjectId) {
            Ok(node) => {
                if node.len() != node.capacity() {
                    eprintln!(
                        "extract_graph: warning. Size and capacity of node {} differ ({} != {}).",
                        id,
                        node.len(),
                        node.capacity()
                    );
                }
                let mut edges = Vec::with_capacity(node.len());
                edges.extend_from_slice(node);
                snapshot.push(edges);
            }
            Err(err) => {
                eprintln!("extract_graph: warning. Cannot get node {}: {}", id, err);
                snapshot.push(Vec::new());
            }
        }
    }

    if verbose {
        println!("Extracted the graph in {:.2?}.", start.elapsed());
    }

    snapshot
}

////////////////
// Symmetrise //
////////////////

/// Make a snapshot bidirectional
///
/// For every edge `u -> v` the reverse edge `v -> u` is added with the
/// forward distance mirrored verbatim, which presumes a symmetric input
/// metric. Every list is then normalised: sorted by `(distance, id)`,
/// deduplicated keeping the closest occurrence per target and compacted to
/// exact capacity. Empty lists are left empty.
///
/// ### Params
///
/// * `snapshot` - The snapshot to symmetrise in place
/// * `verbose` - Print timing information
pub fn symmetrise_graph<T: Float>(snapshot: &mut Snapshot<T>, verbose: bool) {
    let start = Instant::now();

    for idx in 0..snapshot.len() {
        for eni in 0..snapshot[idx].len() {
            let edge = snapshot[idx][eni];
            let target = (edge.id - 1) as usize;
            snapshot[target].push(Neighbour::new((idx + 1) as ObjectId, edge.distance));
        }
    }

    for node in snapshot.iter_mut() {
        if node.is_empty() {
            continue;
        }
        normalise_edges(node);
    }

    if verbose {
        println!("Symmetrised the graph in {:.2?}.", start.elapsed());
    }
}

///////////
// Tests //
///////////
