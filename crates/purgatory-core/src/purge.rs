//! Purge simulation façade for command-line and diagnostic callers.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cluster::{analyze, Cluster, CondensationDag};
use crate::error::Result;
use crate::graph::PackageGraph;
use crate::leaf::LeafFinder;
use crate::mark::{DeletionState, MarkEngine};

/// Policy knobs supplied by the caller.
///
/// The defaults keep nothing and honor recommends, which is the plain graph
/// consequence of a removal request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeOptions {
    /// Packages whose clusters the cascade must never remove.
    pub keep: BTreeSet<String>,
    /// Treat every manually installed package as kept.
    pub keep_manual: bool,
    /// Ignore Recommends edges in leaf detection and obsoleted reporting.
    pub ignore_recommends: bool,
}

/// Runs leaf and purge queries against one graph, analyzing it once.
#[derive(Debug)]
pub struct PurgeSimulator<'g> {
    graph: &'g PackageGraph,
    options: PurgeOptions,
    dag: OnceCell<CondensationDag<'g>>,
}

impl<'g> PurgeSimulator<'g> {
    pub fn new(graph: &'g PackageGraph) -> Self {
        Self::with_options(graph, PurgeOptions::default())
    }

    pub fn with_options(graph: &'g PackageGraph, options: PurgeOptions) -> Self {
        Self {
            graph,
            options,
            dag: OnceCell::new(),
        }
    }

    pub fn graph(&self) -> &'g PackageGraph {
        self.graph
    }

    pub fn options(&self) -> &PurgeOptions {
        &self.options
    }

    /// The condensation DAG, computed on first use.
    pub fn dag(&self) -> Result<&CondensationDag<'g>> {
        if let Some(dag) = self.dag.get() {
            return Ok(dag);
        }
        let dag = analyze(self.graph)?;
        Ok(self.dag.get_or_init(|| dag))
    }

    /// Names protected by the configured policy.
    pub fn protected(&self) -> BTreeSet<String> {
        let mut protected = self.options.keep.clone();
        if self.options.keep_manual {
            protected.extend(self.graph.manual_packages());
        }
        protected
    }

    /// Leaf clusters under the configured policy, in ascending id order.
    pub fn leaves(&self) -> Result<Vec<&Cluster>> {
        let dag = self.dag()?;
        let leaves = LeafFinder::new(dag)
            .respect_recommends(!self.options.ignore_recommends)
            .find(self.protected())?;
        Ok(leaves.collect())
    }

    /// Simulate purging `targets` and summarize the outcome.
    pub fn simulate_purge<I, S>(&self, targets: I) -> Result<PurgeResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets: BTreeSet<String> = targets
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        let dag = self.dag()?;
        let state = MarkEngine::new(dag)
            .keep(self.protected())?
            .ignore_recommends(self.options.ignore_recommends)
            .simulate(&targets)?;

        // Sizes come straight from the snapshot; clamp rather than wrap.
        let mut reclaimed_size = 0u64;
        for name in state.deleted_packages() {
            reclaimed_size = reclaimed_size.saturating_add(self.graph.package(name)?.size());
        }

        Ok(PurgeResult {
            targets: targets.into_iter().collect(),
            deleted_count: state.deleted_packages().len(),
            reclaimed_size,
            state,
        })
    }
}

/// Simulate purging `targets` from `graph` with default options.
pub fn simulate_purge<I, S>(graph: &PackageGraph, targets: I) -> Result<PurgeResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    PurgeSimulator::new(graph).simulate_purge(targets)
}

// ── Result ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeResult {
    /// Requested targets, sorted and deduplicated.
    pub targets: Vec<String>,
    pub deleted_count: usize,
    /// Sum of the sizes of all removed packages.
    pub reclaimed_size: u64,
    #[serde(flatten)]
    pub state: DeletionState,
}

impl PurgeResult {
    pub fn deleted_packages(&self) -> &BTreeSet<String> {
        self.state.deleted_packages()
    }

    /// Shell command an administrator would run to carry out the purge.
    ///
    /// The command carries no `sudo` prefix; the caller decides how to
    /// elevate.
    pub fn apt_command(&self) -> Option<String> {
        if self.state.is_empty() {
            return None;
        }
        let pkgs: Vec<&str> = self
            .deleted_packages()
            .iter()
            .map(String::as_str)
            .collect();
        Some(format!("apt purge {}", pkgs.join(" ")))
    }

    /// Compare against the removal set an external resolver computed.
    pub fn compare<I, S>(&self, expected: I) -> ResolverComparison
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expected: BTreeSet<String> = expected.into_iter().map(Into::into).collect();
        let ours = self.deleted_packages();
        ResolverComparison {
            missing: expected.difference(ours).cloned().collect(),
            unexpected: ours.difference(&expected).cloned().collect(),
        }
    }
}

/// Disagreement between our removal set and an external resolver's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolverComparison {
    /// Removed by the resolver but not by us.
    pub missing: BTreeSet<String>,
    /// Removed by us but not by the resolver.
    pub unexpected: BTreeSet<String>,
}

impl ResolverComparison {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}
