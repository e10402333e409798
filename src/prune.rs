use num_traits::Float;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thousands::*;

use crate::graph::*;

/// Committed lists above this length parallelise the dominating path scan
const PARALLEL_SCAN_THRESHOLD: usize = 1000;

///////////////////////
// Effective pruning //
///////////////////////

/// Remove shortcut-redundant edges in a single parallel pass plus a serial
/// commit
///
/// An edge `s -> w` is shortcut-redundant when some neighbour `v` of `s`
/// offers a two-hop path with both legs strictly shorter than the direct
/// edge, and both legs themselves survive the pruning. Candidate removals
/// are enumerated in parallel against an immutable working copy; the
/// commit then walks all sources rank by rank so that whenever `s` decides
/// about `s -> w`, the fate of both legs is already settled. Input lists
/// must be sorted by ascending distance.
///
/// ### Params
///
/// * `out` - The live graph to prune in place
/// * `verbose` - Print timing information and the removed edge count
///
/// ### Returns
///
/// `Ok(())`, or `GraphError::RemainingCandidates` when candidates survive
/// past the end of a node's edge list, which indicates a corrupt input
/// ordering.
pub fn prune_shortcut_edges<T, G>(out: &mut G, verbose: bool) -> Result<(), GraphError>
where
    T: Float + Send + Sync,
    G: GraphView<T>,
{
    // working copy; live lists restart empty and are refilled rank by rank
    let start_prepare = Instant::now();
    let size = out.size();
    let mut working: Vec<AdjacencyList<T>> = Vec::with_capacity(size.saturating_sub(1));
    for id in 1..size {
        match out.node(id as ObjectId) {
            Ok(node) => {
                working.push(node.clone());
                node.clear();
            }
            Err(err) => {
                eprintln!(
                    "prune_shortcut_edges: warning. Cannot get node {}: {}",
                    id, err
                );
                working.push(Vec::new());
            }
        }
    }
    if verbose {
        println!(
            "Prepared the working graph in {:.2?}.",
            start_prepare.elapsed()
        );
    }

    // stage 1: enumerate removal candidates per source, in parallel
    let start_enumerate = Instant::now();
    let mut remove_candidates: Vec<Vec<(ObjectId, ObjectId)>> = working
        .par_iter()
        .map(|src_node| {
            let mut neighbours: FxHashMap<ObjectId, (usize, T)> = FxHashMap::default();
            for (rank, edge) in src_node.iter().enumerate() {
                neighbours.insert(edge.id, (rank, edge.distance));
            }

            let mut candidates: Vec<(usize, (ObjectId, ObjectId))> = Vec::new();
            for via in src_node {
                let path_node = &working[(via.id - 1) as usize];
                for hop in path_node {
                    if let Some(&(rank, distance)) = neighbours.get(&hop.id) {
                        if via.distance < distance && hop.distance < distance {
                            candidates.push((rank, (via.id, hop.id)));
                        }
                    }
                }
            }

            // the commit walks ranks ascending and pops from the tail
            candidates.sort_unstable_by(|a, b| b.cmp(a));
            candidates.into_iter().map(|(_, pair)| pair).collect()
        })
        .collect();
    if verbose {
        let total: usize = remove_candidates.iter().map(|c| c.len()).sum();
        println!(
            "Found {} removal candidates in {:.2?}.",
            total.separate_with_underscores(),
            start_enumerate.elapsed()
        );
    }

    // stage 2: rank synchronised commit
    let start_commit = Instant::now();
    let mut committed: Vec<FxHashSet<ObjectId>> = vec![FxHashSet::default(); working.len()];
    let mut alive: Vec<usize> = (0..working.len()).collect();
    let mut removed = 0usize;
    let mut rank = 0usize;
    while !alive.is_empty() {
        let mut still_alive = Vec::with_capacity(alive.len());
        for &idx in &alive {
            let src_node = &working[idx];
            if rank >= src_node.len() {
                if !remove_candidates[idx].is_empty() {
                    return Err(GraphError::RemainingCandidates {
                        id: (idx + 1) as ObjectId,
                        remaining: remove_candidates[idx].len(),
                    });
                }
                continue;
            }
            let target = src_node[rank].id;
            let mut path_exists = false;
            while let Some(&(via, hop)) = remove_candidates[idx].last() {
                if hop != target {
                    break;
                }
                remove_candidates[idx].pop();
                if committed[idx].contains(&via) && committed[(via - 1) as usize].contains(&target)
                {
                    path_exists = true;
                    // a surviving two-hop path settles the decision
                    while remove_candidates[idx]
                        .last()
                        .is_some_and(|&(_, hop)| hop == target)
                    {
                        remove_candidates[idx].pop();
                    }
                    break;
                }
            }
            if path_exists {
                removed += 1;
            } else {
                committed[idx].insert(target);
                match out.node((idx + 1) as ObjectId) {
                    Ok(node) => node.push(src_node[rank]),
                    Err(err) => {
                        eprintln!(
                            "prune_shortcut_edges: warning. Cannot get node {}: {}",
                            idx + 1,
                            err
                        );
                    }
                }
            }
            still_alive.push(idx);
        }
        alive = still_alive;
        rank += 1;
    }
    if verbose {
        println!(
            "Committed the pruned graph in {:.2?}, removed {} edges.",
            start_commit.elapsed(),
            removed.separate_with_underscores()
        );
    }

    Ok(())
}

////////////////////
// Simple pruning //
////////////////////

/// Reference variant of the shortcut pruning, one decision at a time
///
/// Walks all sources rank by rank and decides each edge by scanning the
/// committed lists directly for a dominating two-hop path. Slower than
/// `prune_shortcut_edges` but with no candidate cache, which makes it the
/// oracle the tests compare against. Long committed lists parallelise the
/// scan with a best-effort early-out flag.
///
/// ### Params
///
/// * `out` - The live graph to prune in place
/// * `verbose` - Print the removed edge count
pub fn prune_shortcut_edges_simple<T, G>(out: &mut G, verbose: bool) -> Result<(), GraphError>
where
    T: Float + Send + Sync,
    G: GraphView<T>,
{
    let size = out.size();
    let mut working: Vec<AdjacencyList<T>> = Vec::with_capacity(size.saturating_sub(1));
    for id in 1..size {
        match out.node(id as ObjectId) {
            Ok(node) => working.push(node.clone()),
            Err(err) => {
                eprintln!(
                    "prune_shortcut_edges_simple: warning. Cannot get node {}: {}",
                    id, err
                );
                working.push(Vec::new());
            }
        }
    }

    let mut rebuilt: Vec<AdjacencyList<T>> = vec![Vec::new(); working.len()];
    let mut alive: Vec<usize> = (0..working.len()).collect();
    let mut removed = 0usize;
    let mut rank = 0usize;
    while !alive.is_empty() {
        let mut still_alive = Vec::with_capacity(alive.len());
        for &idx in &alive {
            let src_node = &working[idx];
            if rank >= src_node.len() {
                continue;
            }
            let edge = src_node[rank];
            if rank >= 1 && src_node[rank - 1].distance > edge.distance {
                eprintln!(
                    "prune_shortcut_edges_simple: warning. Distance order is wrong at node {} rank {}.",
                    idx + 1,
                    rank
                );
            }
            if dominating_path_exists(&rebuilt, idx, edge) {
                removed += 1;
            } else {
                rebuilt[idx].push(edge);
            }
            still_alive.push(idx);
        }
        alive = still_alive;
        rank += 1;
    }

    for id in 1..size {
        match out.node(id as ObjectId) {
            Ok(node) => *node = std::mem::take(&mut rebuilt[id - 1]),
            Err(err) => {
                eprintln!(
                    "prune_shortcut_edges_simple: warning. Cannot get node {}: {}",
                    id, err
                );
            }
        }
    }

    if verbose {
        println!(
            "Pruned the graph, removed {} edges.",
            removed.separate_with_underscores()
        );
    }

    Ok(())
}

/// Whether a committed two-hop path dominates the direct edge
fn dominating_path_exists<T>(rebuilt: &[AdjacencyList<T>], idx: usize, edge: Neighbour<T>) -> bool
where
    T: Float + Send + Sync,
{
    let committed = &rebuilt[idx];
    if committed.len() > PARALLEL_SCAN_THRESHOLD {
        // best-effort early out, stale reads only cost extra scans
        let found = AtomicBool::new(false);
        committed.par_iter().for_each(|via| {
            if found.load(Ordering::Relaxed) || via.id == edge.id {
                return;
            }
            let path_node = &rebuilt[(via.id - 1) as usize];
            if path_node
                .iter()
                .any(|hop| hop.id == edge.id && hop.distance < edge.distance)
            {
                found.store(true, Ordering::Relaxed);
            }
        });
        found.into_inner()
    } else {
        committed.iter().any(|via| {
            via.id != edge.id
                && rebuilt[(via.id - 1) as usize]
                    .iter()
                    .any(|hop| hop.id == edge.id && hop.distance < edge.distance)
        })
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::reconstruct_graph;
    use crate::snapshot::{extract_graph, symmetrise_graph};
    use crate::utils::normalise_edges;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_lists(n: usize, k: usize, seed: u64) -> Vec<AdjacencyList<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let mut targets = FxHashSet::default();
                while targets.len() < k.min(n - 1) {
                    let t = rng.random_range(1..=n as u32);
                    if t != (i + 1) as u32 {
                        targets.insert(t);
                    }
                }
                let mut edges: AdjacencyList<f64> = targets
                    .into_iter()
                    .map(|t| Neighbour::new(t, rng.random_range(0.0..1.0)))
                    .collect();
                normalise_edges(&mut edges);
                edges
            })
            .collect()
    }

    #[test]
    fn test_prune_removes_shortcut_triangle() {
        let lists = vec![
            vec![Neighbour::new(2, 1.0), Neighbour::new(3, 2.5)],
            vec![Neighbour::new(3, 1.0)],
            vec![],
        ];
        let mut graph = VecGraph::from_lists(lists);

        prune_shortcut_edges(&mut graph, false).unwrap();

        assert_eq!(graph.lists()[0], vec![Neighbour::new(2, 1.0)]);
        assert_eq!(graph.lists()[1], vec![Neighbour::new(3, 1.0)]);
        assert!(graph.lists()[2].is_empty());
    }

    #[test]
    fn test_prune_keeps_non_shortcut() {
        let lists = vec![
            vec![Neighbour::new(3, 0.5), Neighbour::new(2, 1.0)],
            vec![Neighbour::new(3, 1.0)],
            vec![],
        ];
        let mut graph = VecGraph::from_lists(lists.clone());

        prune_shortcut_edges(&mut graph, false).unwrap();

        assert_eq!(graph.lists()[0], lists[0]);
        assert_eq!(graph.lists()[1], lists[1]);
    }

    #[test]
    fn test_prune_empty_graph() {
        let mut graph: VecGraph<f64> = VecGraph::new(0);
        prune_shortcut_edges(&mut graph, false).unwrap();

        let mut graph: VecGraph<f64> = VecGraph::new(3);
        prune_shortcut_edges(&mut graph, false).unwrap();
        assert!(graph.lists().iter().all(|node| node.is_empty()));
    }

    #[test]
    fn test_prune_chain_untouched() {
        // a plain chain has no two-hop shortcuts to remove
        let lists = vec![
            vec![Neighbour::new(2, 1.0)],
            vec![Neighbour::new(3, 1.0)],
            vec![Neighbour::new(4, 1.0)],
            vec![],
        ];
        let mut graph = VecGraph::from_lists(lists.clone());

        prune_shortcut_edges(&mut graph, false).unwrap();

        for (node, expected) in graph.lists().iter().zip(&lists) {
            assert_eq!(node, expected);
        }
    }

    #[test]
    fn test_prune_deterministic() {
        let lists = random_lists(60, 8, 99);

        let mut first = VecGraph::from_lists(lists.clone());
        prune_shortcut_edges(&mut first, false).unwrap();

        let mut second = VecGraph::from_lists(lists);
        prune_shortcut_edges(&mut second, false).unwrap();

        assert_eq!(first.lists(), second.lists());
    }

    #[test]
    fn test_prune_simple_triangle() {
        let lists = vec![
            vec![Neighbour::new(2, 1.0), Neighbour::new(3, 2.5)],
            vec![Neighbour::new(3, 1.0)],
            vec![],
        ];
        let mut graph = VecGraph::from_lists(lists);

        prune_shortcut_edges_simple(&mut graph, false).unwrap();

        assert_eq!(graph.lists()[0], vec![Neighbour::new(2, 1.0)]);
        assert_eq!(graph.lists()[1], vec![Neighbour::new(3, 1.0)]);
        assert!(graph.lists()[2].is_empty());
    }

    #[test]
    fn test_prune_variants_agree() {
        for seed in [1u64, 7, 21, 42] {
            let lists = random_lists(40, 6, seed);

            let mut effective = VecGraph::from_lists(lists.clone());
            prune_shortcut_edges(&mut effective, false).unwrap();

            let mut simple = VecGraph::from_lists(lists);
            prune_shortcut_edges_simple(&mut simple, false).unwrap();

            assert_eq!(effective.lists(), simple.lists(), "seed {}", seed);
        }
    }

    #[test]
    fn test_prune_output_subset_of_input() {
        let lists = random_lists(50, 7, 3);
        let mut graph = VecGraph::from_lists(lists.clone());

        prune_shortcut_edges(&mut graph, false).unwrap();

        for (node, original) in graph.lists().iter().zip(&lists) {
            for edge in node {
                assert!(original.contains(edge));
            }
        }
    }

    #[test]
    fn test_prune_soundness() {
        // every removed edge must be dominated by a retained two-hop path
        let lists = random_lists(50, 7, 17);
        let mut graph = VecGraph::from_lists(lists.clone());

        prune_shortcut_edges(&mut graph, false).unwrap();
        let pruned = graph.lists();

        for (idx, original) in lists.iter().enumerate() {
            for edge in original {
                if pruned[idx].contains(edge) {
                    continue;
                }
                let dominated = pruned[idx].iter().any(|via| {
                    via.distance < edge.distance
                        && pruned[(via.id - 1) as usize].iter().any(|hop| {
                            hop.id == edge.id && hop.distance < edge.distance
                        })
                });
                assert!(
                    dominated,
                    "edge {} -> {} removed without a dominating path",
                    idx + 1,
                    edge.id
                );
            }
        }
    }

    #[test]
    fn test_full_pipeline() {
        let lists = random_lists(40, 6, 5);
        let mut graph = VecGraph::from_lists(lists);

        let mut snapshot = extract_graph(&mut graph, false);
        symmetrise_graph(&mut snapshot, false);
        reconstruct_graph(&snapshot, &mut graph, 4, 4, false).unwrap();
        prune_shortcut_edges(&mut graph, false).unwrap();

        for (idx, node) in graph.lists().iter().enumerate() {
            for (eni, edge) in node.iter().enumerate() {
                assert_ne!(edge.id as usize, idx + 1, "self loop");
                if eni > 0 {
                    assert!(
                        node[eni - 1].distance <= edge.distance,
                        "distance order violated at node {}",
                        idx + 1
                    );
                }
            }
            let targets: FxHashSet<ObjectId> = node.iter().map(|e| e.id).collect();
            assert_eq!(targets.len(), node.len(), "duplicate target");
        }
    }
}
