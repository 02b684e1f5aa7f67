use anyhow::Context;
use purgatory_core::{PurgeResult, PurgeSimulator, ResolverComparison};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read an expected removal set: one package per line, `#` comments allowed.
pub fn read_expected(path: &Path) -> anyhow::Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Human-readable report for a purge simulation.
pub fn render(result: &PurgeResult) -> String {
    let mut out = String::new();
    match result.apt_command() {
        Some(cmd) => {
            out.push_str(
                "Run this apt command to purge the requested packages and all \
                 packages that would be obsoleted by this operation:\n",
            );
            out.push_str(&cmd);
            out.push('\n');
            out.push_str(&format!(
                "{} packages, {} bytes reclaimed\n",
                result.deleted_count, result.reclaimed_size
            ));
        }
        None => out.push_str("Nothing to purge.\n"),
    }
    let obsoleted = result.state.obsoleted();
    if !obsoleted.is_empty() {
        let names: Vec<&str> = obsoleted.iter().map(String::as_str).collect();
        out.push_str(&format!(
            "No longer recommended by anything: {}\n",
            names.join(" ")
        ));
    }
    let broken = result.state.broken();
    if !broken.is_empty() {
        let names: Vec<&str> = broken.iter().map(String::as_str).collect();
        out.push_str(&format!("Would break: {}\n", names.join(" ")));
    }
    out
}

/// JSON document for `purge --json`: the result, plus the resolver
/// comparison when `--expect` was given.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    result: &'a PurgeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<&'a ResolverComparison>,
}

pub fn render_json(
    result: &PurgeResult,
    comparison: Option<&ResolverComparison>,
) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&Report { result, comparison })?)
}

/// `purgatory purge <pkg>...`
pub fn execute(
    sim: &PurgeSimulator<'_>,
    packages: &[String],
    json: bool,
    expect: Option<&Path>,
) -> anyhow::Result<()> {
    debug!(targets = packages.len(), "simulating purge");
    let result = sim.simulate_purge(packages)?;
    for name in result.state.not_installed() {
        info!("The package '{name}' is not installed and hence doesn't need to be purged.");
    }
    if !result.state.broken().is_empty() {
        warn!(
            broken = result.state.broken().len(),
            "purge would leave installed packages with missing dependencies"
        );
    }

    let comparison = match expect {
        Some(path) => Some((path, result.compare(read_expected(path)?))),
        None => None,
    };

    if json {
        println!("{}", render_json(&result, comparison.as_ref().map(|(_, c)| c))?);
    } else {
        print!("{}", render(&result));
        if let Some((_, comparison)) = &comparison {
            for name in &comparison.missing {
                println!("- {name} (expected, not purged)");
            }
            for name in &comparison.unexpected {
                println!("+ {name} (purged, not expected)");
            }
        }
    }

    if let Some((path, comparison)) = comparison {
        if !comparison.is_match() {
            anyhow::bail!(
                "purge set differs from {}: {} missing, {} unexpected",
                path.display(),
                comparison.missing.len(),
                comparison.unexpected.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use purgatory_core::{simulate_purge, InstallState, PackageGraph, PackageRecord};

    fn graph() -> PackageGraph {
        PackageGraph::build(vec![
            PackageRecord::new("app", InstallState::Manual)
                .with_size(10)
                .depends_on(["lib"])
                .recommends(["extra"]),
            PackageRecord::new("lib", InstallState::Automatic).with_size(5),
            PackageRecord::new("extra", InstallState::Automatic),
        ])
        .unwrap()
    }

    #[test]
    fn render_lists_command_and_obsoleted() {
        let g = graph();
        let text = render(&simulate_purge(&g, ["app"]).unwrap());
        assert!(text.contains("apt purge app lib\n"));
        assert!(text.contains("2 packages, 15 bytes reclaimed"));
        assert!(text.contains("No longer recommended by anything: extra"));
        assert!(!text.contains("Would break"));
    }

    #[test]
    fn render_reports_breakage() {
        let g = graph();
        let text = render(&simulate_purge(&g, ["lib"]).unwrap());
        assert!(text.contains("Would break: app"));
    }

    #[test]
    fn json_report_is_one_document() {
        let g = graph();
        let result = simulate_purge(&g, ["app"]).unwrap();
        let comparison = result.compare(["app"]);

        let with: serde_json::Value =
            serde_json::from_str(&render_json(&result, Some(&comparison)).unwrap()).unwrap();
        assert_eq!(with["deleted_count"], 2);
        assert_eq!(with["comparison"]["unexpected"], serde_json::json!(["lib"]));

        let without: serde_json::Value =
            serde_json::from_str(&render_json(&result, None).unwrap()).unwrap();
        assert_eq!(without["targets"], serde_json::json!(["app"]));
        assert!(without.get("comparison").is_none());
    }

    #[test]
    fn expected_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expected.txt");
        std::fs::write(&path, "# from apt-get -s\napp\n\n  lib  \n").unwrap();
        assert_eq!(read_expected(&path).unwrap(), vec!["app", "lib"]);
    }

    #[test]
    fn mismatch_is_an_error() {
        let g = graph();
        let sim = PurgeSimulator::new(&g);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expected.txt");
        std::fs::write(&path, "app\n").unwrap();
        let err = execute(&sim, &["app".to_string()], false, Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("1 unexpected"));
    }
}
