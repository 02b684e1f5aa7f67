//! Cascading mark-deleted simulation over the condensation DAG.
//!
//! Purging a package deletes its whole cluster. Every cluster the deleted one
//! depends on is then re-examined, and it is deleted as well once no live
//! cluster depends on it anymore. Clusters only ever move from kept to
//! deleted, so the worklist drains after at most one visit per condensation
//! edge.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::cluster::{ClusterIx, CondensationDag};
use crate::error::{Error, Result};
use crate::package::EdgeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Kept,
    Deleted,
}

/// Outcome of one simulation; owned by the caller and never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionState {
    #[serde(skip)]
    marks: Vec<Mark>,
    /// Ids of deleted clusters, ascending.
    deleted_clusters: Vec<String>,
    /// Installed packages that would be removed.
    deleted: BTreeSet<String>,
    /// Kept packages whose only recommenders are being removed.
    obsoleted: BTreeSet<String>,
    /// Kept packages left with a Depends edge into a removed package.
    broken: BTreeSet<String>,
    /// Targets that are not installed themselves.
    not_installed: BTreeSet<String>,
}

impl DeletionState {
    pub fn mark(&self, ix: ClusterIx) -> Mark {
        self.marks[ix.index()]
    }

    pub fn is_cluster_deleted(&self, ix: ClusterIx) -> bool {
        self.mark(ix) == Mark::Deleted
    }

    pub fn deleted_clusters(&self) -> &[String] {
        &self.deleted_clusters
    }

    pub fn deleted_packages(&self) -> &BTreeSet<String> {
        &self.deleted
    }

    pub fn is_deleted(&self, name: &str) -> bool {
        self.deleted.contains(name)
    }

    pub fn obsoleted(&self) -> &BTreeSet<String> {
        &self.obsoleted
    }

    pub fn broken(&self) -> &BTreeSet<String> {
        &self.broken
    }

    pub fn not_installed(&self) -> &BTreeSet<String> {
        &self.not_installed
    }

    /// Nothing would be removed.
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
    }
}

/// Cascading deletion engine bound to one condensation DAG.
///
/// The engine holds only read-only data; one instance can serve any number of
/// [`simulate`](MarkEngine::simulate) calls, including concurrent ones.
#[derive(Debug, Clone)]
pub struct MarkEngine<'d, 'g> {
    dag: &'d CondensationDag<'g>,
    keep: Vec<bool>,
    report_obsoleted: bool,
    /// Per cluster: number of live clusters depending on it.
    live_dependents: Vec<usize>,
}

impl<'d, 'g> MarkEngine<'d, 'g> {
    pub fn new(dag: &'d CondensationDag<'g>) -> Self {
        let live_dependents = dag
            .clusters()
            .iter()
            .map(|c| {
                dag.dependents(c.index())
                    .iter()
                    .filter(|&&d| dag.cluster(d).is_live())
                    .count()
            })
            .collect();
        Self {
            dag,
            keep: vec![false; dag.len()],
            report_obsoleted: true,
            live_dependents,
        }
    }

    /// Never cascade into the clusters of these packages.
    ///
    /// Naming a kept package as an explicit target still removes it.
    pub fn keep<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let graph = self.dag.graph();
        for name in names {
            let id = graph.id(name.as_ref())?;
            self.keep[self.dag.cluster_ix(id).index()] = true;
        }
        Ok(self)
    }

    /// Skip obsoleted-package reporting.
    pub fn ignore_recommends(mut self, yes: bool) -> Self {
        self.report_obsoleted = !yes;
        self
    }

    /// Compute the full consequence of purging `targets`.
    ///
    /// Fails with [`Error::NotFound`] before doing any work if a target is not
    /// in the graph.
    pub fn simulate<I, S>(&self, targets: I) -> Result<DeletionState>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dag = self.dag;
        let graph = dag.graph();

        let mut seeds = Vec::new();
        let mut not_installed = BTreeSet::new();
        for name in targets {
            let name = name.as_ref();
            let id = graph.id(name)?;
            if !graph.get(id).is_installed() {
                not_installed.insert(name.to_string());
            }
            // An absent member still takes down a cycle it shares with
            // installed packages.
            let ix = dag.cluster_ix(id);
            if dag.cluster(ix).is_live() {
                seeds.push(ix);
            }
        }

        let mut marks = vec![Mark::Kept; dag.len()];
        let mut remaining = self.live_dependents.clone();
        let mut worklist = Vec::with_capacity(seeds.len());
        for ix in seeds {
            if marks[ix.index()] == Mark::Kept {
                marks[ix.index()] = Mark::Deleted;
                worklist.push(ix);
            }
        }
        let seeded = worklist.len();

        // Every deleted cluster is live, so it was counted in the live
        // dependents of each of its dependencies exactly once.
        while let Some(ix) = worklist.pop() {
            for &dep in dag.dependencies(ix) {
                let left = remaining[dep.index()].checked_sub(1).ok_or_else(|| {
                    Error::InternalInvariant(format!(
                        "live dependent count underflow at cluster '{}'",
                        dag.cluster(dep).id()
                    ))
                })?;
                remaining[dep.index()] = left;
                if left == 0
                    && marks[dep.index()] == Mark::Kept
                    && dag.cluster(dep).is_live()
                    && !self.keep[dep.index()]
                {
                    marks[dep.index()] = Mark::Deleted;
                    worklist.push(dep);
                }
            }
        }

        let mut deleted_clusters = Vec::new();
        let mut deleted = BTreeSet::new();
        let mut broken = BTreeSet::new();
        for cluster in dag.clusters() {
            if marks[cluster.index().index()] != Mark::Deleted {
                continue;
            }
            deleted_clusters.push(cluster.id().to_string());
            for &m in cluster.members() {
                let pkg = graph.get(m);
                if pkg.is_installed() {
                    deleted.insert(pkg.name().to_string());
                }
                for r in graph.incoming_ids(m, EdgeKind::Depends) {
                    let holder = graph.get(r);
                    if holder.is_installed() && marks[dag.cluster_ix(r).index()] == Mark::Kept {
                        broken.insert(holder.name().to_string());
                    }
                }
            }
        }

        let obsoleted = if self.report_obsoleted {
            self.obsoleted(&marks, &remaining)
        } else {
            BTreeSet::new()
        };

        debug!(
            seeded,
            deleted_clusters = deleted_clusters.len(),
            deleted = deleted.len(),
            obsoleted = obsoleted.len(),
            broken = broken.len(),
            "simulation finished"
        );

        Ok(DeletionState {
            marks,
            deleted_clusters,
            deleted,
            obsoleted,
            broken,
            not_installed,
        })
    }

    /// Installed packages in kept clusters that nothing live depends on and
    /// whose every remaining recommender is gone, at least one of them by
    /// this simulation.
    fn obsoleted(&self, marks: &[Mark], remaining: &[usize]) -> BTreeSet<String> {
        let dag = self.dag;
        let graph = dag.graph();
        let mut out = BTreeSet::new();
        for cluster in dag.clusters() {
            let ix = cluster.index();
            if marks[ix.index()] == Mark::Deleted
                || !cluster.is_live()
                || self.keep[ix.index()]
                || remaining[ix.index()] != 0
            {
                continue;
            }
            for &m in cluster.members() {
                let pkg = graph.get(m);
                if !pkg.is_installed() {
                    continue;
                }
                let mut lost_one = false;
                let mut held = false;
                for r in graph.incoming_ids(m, EdgeKind::Recommends) {
                    let rc = dag.cluster_ix(r);
                    if rc == ix {
                        continue;
                    }
                    if marks[rc.index()] == Mark::Deleted {
                        lost_one = true;
                    } else if graph.get(r).is_installed() {
                        held = true;
                        break;
                    }
                }
                if lost_one && !held {
                    out.insert(pkg.name().to_string());
                }
            }
        }
        out
    }
}

/// Simulate purging `targets` with no kept packages.
pub fn simulate<I, S>(dag: &CondensationDag<'_>, targets: I) -> Result<DeletionState>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    MarkEngine::new(dag).simulate(targets)
}
