//! Dependency graph engine for deciding which installed packages can be purged.
//!
//! A [`PackageGraph`] is built once from a metadata snapshot. [`analyze`]
//! clusters it into strongly connected components and condenses those into a
//! DAG, which [`find_leaves`] and [`simulate`] query without ever mutating it.
//! [`PurgeSimulator`] ties the pieces together for front-ends.

pub mod cluster;
pub mod error;
pub mod graph;
pub mod leaf;
pub mod mark;
pub mod package;
pub mod purge;

#[cfg(test)]
mod testing;

pub use cluster::{analyze, Cluster, ClusterExport, ClusterIx, CondensationDag, DagExport};
pub use error::{Error, Result, ValidationError};
pub use graph::PackageGraph;
pub use leaf::{find_leaves, LeafFinder, Leaves};
pub use mark::{simulate, DeletionState, Mark, MarkEngine};
pub use package::{
    Edge, EdgeKind, InstallState, MetadataProvider, Package, PackageId, PackageRecord,
};
pub use purge::{simulate_purge, PurgeOptions, PurgeResult, PurgeSimulator, ResolverComparison};
