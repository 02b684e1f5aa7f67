//! Immutable package dependency graph.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;

use tracing::debug;

use crate::error::{Error, Result, ValidationError};
use crate::package::{
    Edge, EdgeKind, InstallState, MetadataProvider, Package, PackageId, PackageRecord,
};

/// Snapshot of packages and their typed dependency edges.
///
/// Built once from a complete metadata listing and never mutated afterwards.
/// Removal is always expressed as a separate
/// [`DeletionState`](crate::DeletionState), never as an edit of this graph.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    packages: Vec<Package>,
    by_name: HashMap<String, PackageId>,
    /// Sorted by `(from, kind, to)` without duplicates.
    edges: Vec<Edge>,
    /// Per package: slice of `edges` leaving it.
    outgoing: Vec<Range<usize>>,
    /// Per package: indices into `edges` arriving at it, ascending.
    incoming: Vec<Vec<usize>>,
}

impl PackageGraph {
    /// Build a graph from raw records.
    ///
    /// Fails without building anything on a duplicate name or an edge whose
    /// target is not among the records.
    pub fn build<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = PackageRecord>,
    {
        let records: Vec<PackageRecord> = records.into_iter().collect();

        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
        for rec in &records {
            if !seen.insert(rec.name.as_str()) {
                return Err(ValidationError::DuplicatePackage(rec.name.clone()).into());
            }
        }

        // Ids follow name order so every derived listing is reproducible.
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| records[a].name.cmp(&records[b].name));

        let mut packages = Vec::with_capacity(records.len());
        let mut by_name = HashMap::with_capacity(records.len());
        for (idx, &rec_idx) in order.iter().enumerate() {
            let id = PackageId(to_u32(idx)?);
            let rec = &records[rec_idx];
            by_name.insert(rec.name.clone(), id);
            packages.push(Package {
                id,
                name: rec.name.clone(),
                state: rec.state,
                size: rec.size,
            });
        }

        let mut edges = Vec::new();
        for rec in &records {
            let from = by_name[rec.name.as_str()];
            let lists = [
                (EdgeKind::Depends, &rec.depends),
                (EdgeKind::Recommends, &rec.recommends),
            ];
            for (kind, targets) in lists {
                for target in targets {
                    let to = *by_name.get(target.as_str()).ok_or_else(|| {
                        ValidationError::DanglingReference {
                            from: rec.name.clone(),
                            to: target.clone(),
                            kind,
                        }
                    })?;
                    edges.push(Edge { from, kind, to });
                }
            }
        }
        edges.sort_unstable();
        edges.dedup();

        let mut outgoing = vec![0..0; packages.len()];
        let mut incoming = vec![Vec::new(); packages.len()];
        let mut start = 0;
        while start < edges.len() {
            let from = edges[start].from;
            let end = start + edges[start..].partition_point(|e| e.from == from);
            outgoing[from.index()] = start..end;
            start = end;
        }
        for (idx, edge) in edges.iter().enumerate() {
            incoming[edge.to.index()].push(idx);
        }

        debug!(
            packages = packages.len(),
            edges = edges.len(),
            "package graph built"
        );

        Ok(Self {
            packages,
            by_name,
            edges,
            outgoing,
            incoming,
        })
    }

    /// Build a graph from whatever the provider supplies.
    pub fn from_provider(provider: &dyn MetadataProvider) -> anyhow::Result<Self> {
        let records = provider.package_records()?;
        Ok(Self::build(records)?)
    }

    // ── Lookup ──

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All packages in ascending name order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> + '_ {
        self.packages.iter()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn id(&self, name: &str) -> Result<PackageId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn package(&self, name: &str) -> Result<&Package> {
        self.id(name).map(|id| self.get(id))
    }

    /// Resolve an id handed out by this graph.
    pub fn get(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn name(&self, id: PackageId) -> &str {
        &self.packages[id.index()].name
    }

    /// Names of manually installed packages.
    pub fn manual_packages(&self) -> BTreeSet<String> {
        self.packages
            .iter()
            .filter(|p| p.state == InstallState::Manual)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Names of all installed packages, manual or automatic.
    pub fn installed_packages(&self) -> BTreeSet<String> {
        self.packages
            .iter()
            .filter(|p| p.is_installed())
            .map(|p| p.name.clone())
            .collect()
    }

    // ── Name-based queries ──

    /// Packages `name` hard-depends on.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id(name)?;
        Ok(self.names(self.outgoing_ids(id, EdgeKind::Depends)))
    }

    /// Packages holding a Depends edge into `name`.
    pub fn dependents_of(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id(name)?;
        Ok(self.names(self.incoming_ids(id, EdgeKind::Depends)))
    }

    /// Packages `name` recommends.
    pub fn recommends_of(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id(name)?;
        Ok(self.names(self.outgoing_ids(id, EdgeKind::Recommends)))
    }

    /// Packages holding a Recommends edge into `name`.
    pub fn recommenders_of(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id(name)?;
        Ok(self.names(self.incoming_ids(id, EdgeKind::Recommends)))
    }

    // ── Id-based adjacency ──

    /// Targets of `id`'s edges of `kind`, ascending.
    pub fn outgoing_ids(
        &self,
        id: PackageId,
        kind: EdgeKind,
    ) -> impl Iterator<Item = PackageId> + '_ {
        self.edges[self.outgoing[id.index()].clone()]
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| e.to)
    }

    /// Sources of edges of `kind` into `id`, ascending.
    pub fn incoming_ids(
        &self,
        id: PackageId,
        kind: EdgeKind,
    ) -> impl Iterator<Item = PackageId> + '_ {
        self.incoming[id.index()]
            .iter()
            .map(move |&idx| self.edges[idx])
            .filter(move |e| e.kind == kind)
            .map(|e| e.from)
    }

    fn names(&self, ids: impl Iterator<Item = PackageId>) -> Vec<&str> {
        ids.map(|id| self.name(id)).collect()
    }
}

fn to_u32(idx: usize) -> Result<u32> {
    u32::try_from(idx)
        .map_err(|_| Error::InternalInvariant(format!("package index {idx} exceeds u32 range")))
}
