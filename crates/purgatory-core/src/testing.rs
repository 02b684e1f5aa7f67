//! Graph fixtures shared by unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::PackageGraph;
use crate::package::{InstallState, PackageRecord};

pub fn auto(name: &str) -> PackageRecord {
    PackageRecord::new(name, InstallState::Automatic)
}

pub fn manual(name: &str) -> PackageRecord {
    PackageRecord::new(name, InstallState::Manual)
}

pub fn absent(name: &str) -> PackageRecord {
    PackageRecord::new(name, InstallState::Absent)
}

pub fn graph(records: Vec<PackageRecord>) -> PackageGraph {
    PackageGraph::build(records).unwrap()
}

/// Random graph with back edges so that non-trivial cycles show up.
pub fn random_graph(seed: u64, nodes: usize, edge_prob: f64) -> PackageGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let names: Vec<String> = (0..nodes).map(|i| format!("pkg{i:04}")).collect();
    let mut records = Vec::with_capacity(nodes);
    for name in &names {
        let state = match rng.gen_range(0..10) {
            0 => InstallState::Manual,
            1 => InstallState::Absent,
            _ => InstallState::Automatic,
        };
        let mut rec = PackageRecord::new(name.clone(), state).with_size(rng.gen_range(1..1000));
        for other in &names {
            if rng.gen_bool(edge_prob) {
                rec.depends.push(other.clone());
            }
            if rng.gen_bool(edge_prob / 2.0) {
                rec.recommends.push(other.clone());
            }
        }
        records.push(rec);
    }
    PackageGraph::build(records).unwrap()
}
