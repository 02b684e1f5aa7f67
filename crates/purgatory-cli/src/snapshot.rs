use anyhow::Context;
use purgatory_core::{MetadataProvider, PackageRecord};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Package metadata exported to a JSON file (`-` reads stdin).
///
/// Accepts either a bare array of records or `{"packages": [...]}`.
#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    List(Vec<PackageRecord>),
    Wrapped { packages: Vec<PackageRecord> },
}

impl JsonSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<String> {
        if self.path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading snapshot from stdin")?;
            return Ok(buf);
        }
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))
    }
}

impl MetadataProvider for JsonSnapshot {
    fn package_records(&self) -> anyhow::Result<Vec<PackageRecord>> {
        let content = self.read()?;
        parse_snapshot(&content)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))
    }
}

pub fn parse_snapshot(content: &str) -> anyhow::Result<Vec<PackageRecord>> {
    let file: SnapshotFile = serde_json::from_str(content)?;
    Ok(match file {
        SnapshotFile::List(records) => records,
        SnapshotFile::Wrapped { packages } => packages,
    })
}
