//! Pure topology generation: `(nodeCount, topologyType, seed) -> neighbor map`.

use std::collections::{BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_types::{NodeId, SimError, TopologyType};

pub type NeighborMap = HashMap<NodeId, BTreeSet<NodeId>>;

/// Generates a symmetric neighbor map for `node_count` nodes laid out
/// according to `topology_type`. `seed` drives RANDOM generation only; it
/// is ignored by the other topology kinds, which are fully determined by
/// `node_count`.
pub fn generate(
    node_count: usize,
    topology_type: TopologyType,
    seed: i64,
) -> Result<NeighborMap, SimError> {
    if node_count == 0 {
        return Err(SimError::InvalidArgument(
            "nodeCount must be >= 1".to_string(),
        ));
    }

    let map = match topology_type {
        TopologyType::Line => line(node_count),
        TopologyType::Ring => ring(node_count),
        TopologyType::Grid => grid(node_count),
        TopologyType::Random => random(node_count, seed),
    };
    Ok(map)
}

fn ids(node_count: usize) -> Vec<NodeId> {
    (0..node_count).map(NodeId::from_index).collect()
}

fn empty_map(ids: &[NodeId]) -> NeighborMap {
    ids.iter()
        .map(|id| (id.clone(), BTreeSet::new()))
        .collect()
}

fn connect(map: &mut NeighborMap, ids: &[NodeId], a: usize, b: usize) {
    map.get_mut(&ids[a]).unwrap().insert(ids[b].clone());
    map.get_mut(&ids[b]).unwrap().insert(ids[a].clone());
}

fn line(node_count: usize) -> NeighborMap {
    let ids = ids(node_count);
    let mut map = empty_map(&ids);
    for i in 0..node_count.saturating_sub(1) {
        connect(&mut map, &ids, i, i + 1);
    }
    map
}

fn ring(node_count: usize) -> NeighborMap {
    let ids = ids(node_count);
    let mut map = empty_map(&ids);
    if node_count == 1 {
        map.get_mut(&ids[0]).unwrap().insert(ids[0].clone());
        return map;
    }
    for i in 0..node_count {
        let prev = (i + node_count - 1) % node_count;
        let next = (i + 1) % node_count;
        connect(&mut map, &ids, i, prev);
        connect(&mut map, &ids, i, next);
    }
    map
}

fn grid(node_count: usize) -> NeighborMap {
    let ids = ids(node_count);
    let mut map = empty_map(&ids);
    let side = (node_count as f64).sqrt().ceil() as usize;
    for i in 0..node_count {
        let row = i / side;
        let col = i % side;
        // right neighbor
        if col + 1 < side {
            let j = row * side + col + 1;
            if j < node_count {
                connect(&mut map, &ids, i, j);
            }
        }
        // down neighbor
        let below = (row + 1) * side + col;
        if below < node_count {
            connect(&mut map, &ids, i, below);
        }
    }
    map
}

/// Deterministic from `seed`: a random recursive spanning tree (node `i`
/// attaches to a uniformly chosen earlier node, guaranteeing connectivity)
/// plus up to `node_count` bonus edges between distinct random pairs.
fn random(node_count: usize, seed: i64) -> NeighborMap {
    let ids = ids(node_count);
    let mut map = empty_map(&ids);
    let mut rng = StdRng::seed_from_u64(seed as u64);

    for i in 1..node_count {
        let parent = rng.random_range(0..i);
        connect(&mut map, &ids, i, parent);
    }

    if node_count >= 3 {
        for _ in 0..node_count {
            let a = rng.random_range(0..node_count);
            let b = rng.random_range(0..node_count);
            if a != b {
                connect(&mut map, &ids, a, b);
            }
        }
    }

    map
}
