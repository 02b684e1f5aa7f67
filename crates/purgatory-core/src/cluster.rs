//! Strongly connected clustering over Depends edges and the condensation DAG.

use std::collections::BTreeSet;

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::PackageGraph;
use crate::package::{EdgeKind, Package, PackageId};

/// Dense cluster index; ascending index means ascending cluster id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterIx(pub(crate) u32);

impl ClusterIx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A maximal set of packages mutually reachable via Depends edges.
///
/// Deleting any member deletes the whole cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    index: ClusterIx,
    id: String,
    members: Vec<PackageId>,
    live: bool,
}

impl Cluster {
    pub fn index(&self) -> ClusterIx {
        self.index
    }

    /// Stable identifier: the lexicographically smallest member name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Members in ascending name order.
    pub fn members(&self) -> &[PackageId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when the cluster glues several packages together.
    pub fn is_cycle(&self) -> bool {
        self.members.len() > 1
    }

    /// At least one member is currently installed.
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Acyclic graph of clusters with Depends edges collapsed across cluster
/// boundaries.
///
/// Derived once from a [`PackageGraph`] and immutable afterwards; safe to share
/// between concurrent simulations.
#[derive(Debug, Clone)]
pub struct CondensationDag<'g> {
    graph: &'g PackageGraph,
    clusters: Vec<Cluster>,
    cluster_of: Vec<ClusterIx>,
    /// Clusters each cluster depends on, ascending.
    dependencies: Vec<Vec<ClusterIx>>,
    /// Clusters depending on each cluster, ascending.
    dependents: Vec<Vec<ClusterIx>>,
    /// Dependents before their dependencies.
    topo: Vec<ClusterIx>,
    edge_count: usize,
}

/// Cluster the Depends subgraph of `graph` and build its condensation.
///
/// Returns [`Error::InternalInvariant`] if the condensation turns out cyclic,
/// which can only be a defect in the clustering.
pub fn analyze(graph: &PackageGraph) -> Result<CondensationDag<'_>> {
    let mut depends: DiGraph<(), ()> = DiGraph::with_capacity(graph.len(), graph.edges().len());
    for _ in 0..graph.len() {
        depends.add_node(());
    }
    for edge in graph.edges().iter().filter(|e| e.kind == EdgeKind::Depends) {
        depends.add_edge(
            NodeIndex::new(edge.from.index()),
            NodeIndex::new(edge.to.index()),
            (),
        );
    }

    // Ids are name ordered, so the first member after sorting is the
    // smallest name and sorting components by it orders clusters by id.
    let mut components: Vec<Vec<PackageId>> = kosaraju_scc(&depends)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<PackageId> = scc
                .into_iter()
                .map(|n| PackageId(n.index() as u32))
                .collect();
            members.sort_unstable();
            members
        })
        .collect();
    components.sort_unstable_by_key(|members| members[0]);

    let mut cluster_of = vec![ClusterIx(0); graph.len()];
    let mut clusters = Vec::with_capacity(components.len());
    for (idx, members) in components.into_iter().enumerate() {
        let index = ClusterIx(idx as u32);
        for &m in &members {
            cluster_of[m.index()] = index;
        }
        clusters.push(Cluster {
            index,
            id: graph.name(members[0]).to_string(),
            live: members.iter().any(|&m| graph.get(m).is_installed()),
            members,
        });
    }

    let mut collapsed: BTreeSet<(ClusterIx, ClusterIx)> = BTreeSet::new();
    for edge in graph.edges().iter().filter(|e| e.kind == EdgeKind::Depends) {
        let from = cluster_of[edge.from.index()];
        let to = cluster_of[edge.to.index()];
        if from != to {
            collapsed.insert((from, to));
        }
    }

    let mut dependencies = vec![Vec::new(); clusters.len()];
    let mut dependents = vec![Vec::new(); clusters.len()];
    let mut condensed: DiGraph<(), ()> = DiGraph::with_capacity(clusters.len(), collapsed.len());
    for _ in 0..clusters.len() {
        condensed.add_node(());
    }
    // `collapsed` is ordered, so both adjacency lists come out ascending.
    for &(from, to) in &collapsed {
        dependencies[from.index()].push(to);
        dependents[to.index()].push(from);
        condensed.add_edge(NodeIndex::new(from.index()), NodeIndex::new(to.index()), ());
    }

    let topo = toposort(&condensed, None).map_err(|cycle| {
        let at = &clusters[cycle.node_id().index()];
        Error::InternalInvariant(format!(
            "condensation is cyclic through cluster '{}'",
            at.id
        ))
    })?;
    let topo = topo.into_iter().map(|n| ClusterIx(n.index() as u32)).collect();

    debug!(
        clusters = clusters.len(),
        cycles = clusters.iter().filter(|c| c.is_cycle()).count(),
        edges = collapsed.len(),
        "condensation built"
    );

    Ok(CondensationDag {
        graph,
        clusters,
        cluster_of,
        dependencies,
        dependents,
        topo,
        edge_count: collapsed.len(),
    })
}

impl<'g> CondensationDag<'g> {
    pub fn graph(&self) -> &'g PackageGraph {
        self.graph
    }

    /// All clusters in ascending id order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, ix: ClusterIx) -> &Cluster {
        &self.clusters[ix.index()]
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Cluster owning the named package.
    pub fn cluster_of(&self, name: &str) -> Result<&Cluster> {
        let id = self.graph.id(name)?;
        Ok(self.cluster(self.cluster_ix(id)))
    }

    pub fn cluster_ix(&self, id: PackageId) -> ClusterIx {
        self.cluster_of[id.index()]
    }

    pub fn dependencies(&self, ix: ClusterIx) -> &[ClusterIx] {
        &self.dependencies[ix.index()]
    }

    pub fn dependents(&self, ix: ClusterIx) -> &[ClusterIx] {
        &self.dependents[ix.index()]
    }

    /// Clusters ordered so that every cluster precedes the ones it depends on.
    pub fn topological_order(&self) -> &[ClusterIx] {
        &self.topo
    }

    /// Member packages of a cluster, ascending by name.
    pub fn members(&self, ix: ClusterIx) -> impl Iterator<Item = &'g Package> + '_ {
        let graph = self.graph;
        self.cluster(ix).members.iter().map(move |&m| graph.get(m))
    }

    /// Member names of a cluster, ascending.
    pub fn member_names(&self, ix: ClusterIx) -> Vec<&'g str> {
        self.members(ix).map(|p| p.name()).collect()
    }

    /// Collapsed edges as `(dependent id, dependency id)`, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.dependencies.iter().enumerate().flat_map(move |(from, tos)| {
            tos.iter()
                .map(move |to| (self.clusters[from].id(), self.cluster(*to).id()))
        })
    }

    /// Owned node/edge listing for rendering layers.
    pub fn export(&self) -> DagExport {
        DagExport {
            clusters: self
                .clusters
                .iter()
                .map(|c| ClusterExport {
                    id: c.id.clone(),
                    members: self
                        .member_names(c.index)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    live: c.live,
                })
                .collect(),
            edges: self
                .edges()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

// ── Export ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterExport {
    pub id: String,
    pub members: Vec<String>,
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagExport {
    pub clusters: Vec<ClusterExport>,
    pub edges: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{absent, auto, graph, random_graph};

    fn ids<'a>(dag: &CondensationDag<'a>) -> Vec<Vec<&'a str>> {
        dag.clusters()
            .iter()
            .map(|c| dag.member_names(c.index()))
            .collect()
    }

    #[test]
    fn mutual_dependency_is_one_cluster() {
        let g = graph(vec![auto("a").depends_on(["b"]), auto("b").depends_on(["a"])]);
        let dag = analyze(&g).unwrap();
        assert_eq!(ids(&dag), vec![vec!["a", "b"]]);
        assert!(dag.clusters()[0].is_cycle());
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn chain_stays_singletons() {
        let g = graph(vec![
            auto("a").depends_on(["b"]),
            auto("b").depends_on(["c"]),
            auto("c"),
        ]);
        let dag = analyze(&g).unwrap();
        assert_eq!(ids(&dag), vec![vec!["a"], vec!["b"], vec!["c"]]);
        let edges: Vec<_> = dag.edges().collect();
        assert_eq!(edges, vec![("a", "b"), ("b", "c")]);
        let order: Vec<&str> = dag
            .topological_order()
            .iter()
            .map(|&ix| dag.cluster(ix).id())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn cluster_id_is_smallest_member() {
        let g = graph(vec![
            auto("zeta").depends_on(["mu"]),
            auto("mu").depends_on(["beta"]),
            auto("beta").depends_on(["zeta"]),
        ]);
        let dag = analyze(&g).unwrap();
        assert_eq!(dag.len(), 1);
        assert_eq!(dag.clusters()[0].id(), "beta");
        assert_eq!(dag.cluster_of("zeta").unwrap().id(), "beta");
    }

    #[test]
    fn recommends_do_not_form_cycles() {
        let g = graph(vec![auto("a").depends_on(["b"]), auto("b").recommends(["a"])]);
        let dag = analyze(&g).unwrap();
        assert_eq!(ids(&dag), vec![vec!["a"], vec!["b"]]);
        assert_eq!(dag.edges().collect::<Vec<_>>(), vec![("a", "b")]);
    }

    #[test]
    fn edges_into_a_cycle_are_collapsed() {
        let g = graph(vec![
            auto("app").depends_on(["x", "y"]),
            auto("x").depends_on(["y", "lib"]),
            auto("y").depends_on(["x", "lib"]),
            auto("lib"),
        ]);
        let dag = analyze(&g).unwrap();
        assert_eq!(ids(&dag), vec![vec!["app"], vec!["lib"], vec!["x", "y"]]);
        let edges: Vec<_> = dag.edges().collect();
        assert_eq!(edges, vec![("app", "x"), ("x", "lib")]);
        let xy = dag.cluster_of("y").unwrap().index();
        assert_eq!(dag.dependents(xy).len(), 1);
        assert_eq!(dag.dependencies(xy).len(), 1);
    }

    #[test]
    fn self_loop_is_a_singleton() {
        let g = graph(vec![auto("a").depends_on(["a"])]);
        let dag = analyze(&g).unwrap();
        assert_eq!(dag.len(), 1);
        assert!(!dag.clusters()[0].is_cycle());
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn liveness_tracks_installed_members() {
        let g = graph(vec![auto("a").depends_on(["gone"]), absent("gone")]);
        let dag = analyze(&g).unwrap();
        assert!(dag.cluster_of("a").unwrap().is_live());
        assert!(!dag.cluster_of("gone").unwrap().is_live());
    }

    #[test]
    fn unknown_package_not_found() {
        let g = graph(vec![auto("a")]);
        let dag = analyze(&g).unwrap();
        assert_eq!(
            dag.cluster_of("b").unwrap_err(),
            Error::NotFound("b".into())
        );
    }

    #[test]
    fn empty_graph_gives_empty_dag() {
        let g = graph(Vec::new());
        let dag = analyze(&g).unwrap();
        assert!(dag.is_empty());
        assert!(dag.topological_order().is_empty());
    }

    #[test]
    fn export_lists_nodes_and_edges() {
        let g = graph(vec![
            auto("a").depends_on(["b"]),
            auto("b").depends_on(["a", "c"]),
            absent("c"),
        ]);
        let export = analyze(&g).unwrap().export();
        assert_eq!(export.clusters.len(), 2);
        assert_eq!(export.clusters[0].members, vec!["a", "b"]);
        assert!(!export.clusters[1].live);
        assert_eq!(export.edges, vec![("a".to_string(), "c".to_string())]);
    }

    #[test]
    fn random_graphs_partition_packages() {
        for seed in 0..20 {
            let g = random_graph(seed, 60, 0.04);
            let dag = analyze(&g).unwrap();
            let mut seen = vec![false; g.len()];
            for cluster in dag.clusters() {
                for &m in cluster.members() {
                    assert!(!seen[m.index()], "package in two clusters");
                    seen[m.index()] = true;
                    assert_eq!(dag.cluster_ix(m), cluster.index());
                }
            }
            assert!(seen.iter().all(|&s| s), "package without cluster");
        }
    }

    #[test]
    fn adjacency_lists_are_ascending() {
        for seed in 0..20 {
            let g = random_graph(seed, 60, 0.05);
            let dag = analyze(&g).unwrap();
            for cluster in dag.clusters() {
                let ix = cluster.index();
                assert!(dag.dependencies(ix).windows(2).all(|w| w[0] < w[1]));
                assert!(dag.dependents(ix).windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn random_graphs_condense_acyclic() {
        for seed in 0..20 {
            let g = random_graph(seed, 60, 0.05);
            let dag = analyze(&g).unwrap();
            let mut position = vec![0; dag.len()];
            for (pos, &ix) in dag.topological_order().iter().enumerate() {
                position[ix.index()] = pos;
            }
            for cluster in dag.clusters() {
                for &dep in dag.dependencies(cluster.index()) {
                    assert!(position[cluster.index().index()] < position[dep.index()]);
                }
            }
        }
    }

    #[test]
    fn random_graphs_cluster_members_are_mutually_reachable() {
        for seed in 0..10 {
            let g = random_graph(seed, 40, 0.06);
            let dag = analyze(&g).unwrap();
            for cluster in dag.clusters().iter().filter(|c| c.is_cycle()) {
                let first = cluster.members()[0];
                let reach = reachable(&g, first);
                for &m in cluster.members() {
                    assert!(reach.contains(&m));
                    assert!(reachable(&g, m).contains(&first));
                }
            }
        }
    }

    #[test]
    fn analysis_is_deterministic() {
        let g = random_graph(7, 80, 0.04);
        let a = analyze(&g).unwrap().export();
        let b = analyze(&g).unwrap().export();
        assert_eq!(a, b);
    }

    fn reachable(g: &PackageGraph, start: PackageId) -> BTreeSet<PackageId> {
        let mut seen = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            for next in g.outgoing_ids(id, EdgeKind::Depends) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen
    }
}
