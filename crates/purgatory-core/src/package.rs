//! Package records, edges, and the metadata provider seam.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Install state ──

/// Why (and whether) a package is on the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    /// Explicitly installed by the administrator.
    Manual,
    /// Pulled in as a dependency of something else.
    #[default]
    Automatic,
    /// Known from historical metadata but not currently installed.
    Absent,
}

impl InstallState {
    pub fn is_installed(self) -> bool {
        !matches!(self, InstallState::Absent)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallState::Manual => write!(f, "manual"),
            InstallState::Automatic => write!(f, "automatic"),
            InstallState::Absent => write!(f, "absent"),
        }
    }
}

// ── Edges ──

/// Relationship carried by an [`Edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Hard requirement; participates in clustering and cascading deletion.
    Depends,
    /// Advisory; only used for obsoleted reporting and optional leaf blocking.
    Recommends,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Depends => write!(f, "depends"),
            EdgeKind::Recommends => write!(f, "recommends"),
        }
    }
}

/// Dense package index inside a [`PackageGraph`](crate::PackageGraph).
///
/// Ids follow ascending package name order, so sorting by id sorts by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId(pub(crate) u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed, directed edge between two packages of the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub from: PackageId,
    pub kind: EdgeKind,
    pub to: PackageId,
}

// ── Records ──

/// Raw package metadata as supplied by a [`MetadataProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    #[serde(default)]
    pub state: InstallState,
    /// Approximate installed size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<String>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, state: InstallState) -> Self {
        Self {
            name: name.into(),
            state,
            size: 0,
            depends: Vec::new(),
            recommends: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn recommends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommends.extend(names.into_iter().map(Into::into));
        self
    }
}

/// An immutable package node once loaded into a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub(crate) id: PackageId,
    pub(crate) name: String,
    pub(crate) state: InstallState,
    pub(crate) size: u64,
}

impl Package {
    pub fn id(&self) -> PackageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_installed(&self) -> bool {
        self.state.is_installed()
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Supplies a complete, self-consistent snapshot of package metadata.
///
/// Reading the system's package database lives behind this trait; the engine
/// itself never performs I/O.
pub trait MetadataProvider {
    fn package_records(&self) -> anyhow::Result<Vec<PackageRecord>>;
}

impl MetadataProvider for Vec<PackageRecord> {
    fn package_records(&self) -> anyhow::Result<Vec<PackageRecord>> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_from_json() {
        let rec: PackageRecord = serde_json::from_str(r#"{"name": "libc6"}"#).unwrap();
        assert_eq!(rec.name, "libc6");
        assert_eq!(rec.state, InstallState::Automatic);
        assert_eq!(rec.size, 0);
        assert!(rec.depends.is_empty());
        assert!(rec.recommends.is_empty());
    }

    #[test]
    fn record_full_json() {
        let rec: PackageRecord = serde_json::from_str(
            r#"{"name": "vim", "state": "manual", "size": 3100,
                "depends": ["vim-runtime", "libc6"], "recommends": ["xxd"]}"#,
        )
        .unwrap();
        assert_eq!(rec.state, InstallState::Manual);
        assert_eq!(rec.size, 3100);
        assert_eq!(rec.depends, vec!["vim-runtime", "libc6"]);
        assert_eq!(rec.recommends, vec!["xxd"]);
    }

    #[test]
    fn unknown_state_is_rejected() {
        let res: Result<PackageRecord, _> =
            serde_json::from_str(r#"{"name": "x", "state": "held"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn absent_is_not_installed() {
        assert!(InstallState::Manual.is_installed());
        assert!(InstallState::Automatic.is_installed());
        assert!(!InstallState::Absent.is_installed());
    }

    #[test]
    fn builder_collects_edges() {
        let rec = PackageRecord::new("a", InstallState::Manual)
            .with_size(7)
            .depends_on(["b", "c"])
            .recommends(["d"]);
        assert_eq!(rec.size, 7);
        assert_eq!(rec.depends, vec!["b", "c"]);
        assert_eq!(rec.recommends, vec!["d"]);
    }
}
