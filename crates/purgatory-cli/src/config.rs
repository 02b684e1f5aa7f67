use anyhow::Context;
use purgatory_core::PurgeOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings read from the optional JSON config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot file used when `--snapshot` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    /// Packages that must never be removed as a side effect.
    pub keep: BTreeSet<String>,
    /// Protect manually installed packages.
    pub keep_manual: bool,
    /// Ignore Recommends relationships.
    pub ignore_recommends: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot: None,
            keep: BTreeSet::new(),
            keep_manual: true,
            ignore_recommends: false,
        }
    }
}

impl Config {
    /// Fold command-line overrides into the file settings.
    pub fn apply_flags(&mut self, keep: &[String], ignore_recommends: bool, include_manual: bool) {
        self.keep.extend(keep.iter().cloned());
        if ignore_recommends {
            self.ignore_recommends = true;
        }
        if include_manual {
            self.keep_manual = false;
        }
    }

    pub fn purge_options(&self) -> PurgeOptions {
        PurgeOptions {
            keep: self.keep.clone(),
            keep_manual: self.keep_manual,
            ignore_recommends: self.ignore_recommends,
        }
    }
}

/// Read config from `path`. Returns defaults if no path is given or the file
/// doesn't exist.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.keep_manual);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path().join("nope.json").as_path())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purgatory.json");
        std::fs::write(&path, r#"{"keep": ["openssh-server"], "ignore_recommends": true}"#)
            .unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert!(config.keep.contains("openssh-server"));
        assert!(config.ignore_recommends);
        assert!(config.keep_manual);
        assert!(config.snapshot.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purgatory.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn flags_override_file() {
        let mut config = Config::default();
        config.apply_flags(&["sudo".to_string()], true, true);
        let opts = config.purge_options();
        assert!(opts.keep.contains("sudo"));
        assert!(opts.ignore_recommends);
        assert!(!opts.keep_manual);
    }
}
