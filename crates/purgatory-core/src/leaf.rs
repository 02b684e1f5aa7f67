//! Leaf cluster detection.
//!
//! A leaf is a live cluster that no other live cluster depends on and that
//! holds no protected package. Leaves can be purged without touching anything
//! else that is installed.

use crate::cluster::{Cluster, ClusterIx, CondensationDag};
use crate::error::Result;
use crate::package::EdgeKind;

/// Configurable leaf search over a condensation DAG.
#[derive(Debug, Clone, Copy)]
pub struct LeafFinder<'d, 'g> {
    dag: &'d CondensationDag<'g>,
    respect_recommends: bool,
}

impl<'d, 'g> LeafFinder<'d, 'g> {
    pub fn new(dag: &'d CondensationDag<'g>) -> Self {
        Self {
            dag,
            respect_recommends: false,
        }
    }

    /// Also treat a Recommends edge from a live package outside the cluster
    /// as holding the cluster in place.
    pub fn respect_recommends(mut self, yes: bool) -> Self {
        self.respect_recommends = yes;
        self
    }

    /// Leaves in ascending cluster id order.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when a protected
    /// name is not in the graph.
    pub fn find<I, S>(&self, protected: I) -> Result<Leaves<'d, 'g>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let graph = self.dag.graph();
        let mut blocked = vec![false; self.dag.len()];
        for name in protected {
            let id = graph.id(name.as_ref())?;
            blocked[self.dag.cluster_ix(id).index()] = true;
        }
        Ok(Leaves {
            dag: self.dag,
            blocked,
            respect_recommends: self.respect_recommends,
            next: 0,
        })
    }
}

/// Leaves of `dag`, honoring Depends edges only.
pub fn find_leaves<'d, 'g, I, S>(
    dag: &'d CondensationDag<'g>,
    protected: I,
) -> Result<Leaves<'d, 'g>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    LeafFinder::new(dag).find(protected)
}

/// Lazy, finite sequence of leaf clusters.
///
/// Clone it (or call [`Leaves::restart`]) to walk the same sequence again.
#[derive(Debug, Clone)]
pub struct Leaves<'d, 'g> {
    dag: &'d CondensationDag<'g>,
    blocked: Vec<bool>,
    respect_recommends: bool,
    next: usize,
}

impl<'d, 'g> Leaves<'d, 'g> {
    pub fn restart(&mut self) {
        self.next = 0;
    }

    fn is_leaf(&self, ix: ClusterIx) -> bool {
        let dag = self.dag;
        let cluster = dag.cluster(ix);
        if !cluster.is_live() || self.blocked[ix.index()] {
            return false;
        }
        if dag.dependents(ix).iter().any(|&d| dag.cluster(d).is_live()) {
            return false;
        }
        if self.respect_recommends {
            let graph = dag.graph();
            let recommended = cluster.members().iter().any(|&m| {
                graph
                    .incoming_ids(m, EdgeKind::Recommends)
                    .any(|r| dag.cluster_ix(r) != ix && graph.get(r).is_installed())
            });
            if recommended {
                return false;
            }
        }
        true
    }
}

impl<'d, 'g> Iterator for Leaves<'d, 'g> {
    type Item = &'d Cluster;

    fn next(&mut self) -> Option<Self::Item> {
        let dag = self.dag;
        while self.next < dag.len() {
            let ix = dag.clusters()[self.next].index();
            self.next += 1;
            if self.is_leaf(ix) {
                return Some(dag.cluster(ix));
            }
        }
        None
    }
}
