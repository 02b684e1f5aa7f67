use purgatory_core::{CondensationDag, DagExport, PurgeSimulator};
use std::collections::BTreeSet;

/// Text rendering: `[id] members -> dependency ids`, one cluster per line.
pub fn cluster_lines(dag: &CondensationDag<'_>, cycles_only: bool) -> Vec<String> {
    dag.clusters()
        .iter()
        .filter(|c| !cycles_only || c.is_cycle())
        .map(|cluster| {
            let members = dag.member_names(cluster.index()).join(" ");
            let deps: Vec<&str> = dag
                .dependencies(cluster.index())
                .iter()
                .map(|&d| dag.cluster(d).id())
                .collect();
            if deps.is_empty() {
                format!("[{}] {members}", cluster.id())
            } else {
                format!("[{}] {members} -> {}", cluster.id(), deps.join(", "))
            }
        })
        .collect()
}

/// DAG export, restricted to cyclic clusters and the edges between them when
/// `cycles_only` is set.
pub fn export(dag: &CondensationDag<'_>, cycles_only: bool) -> DagExport {
    let mut export = dag.export();
    if cycles_only {
        let cyclic: BTreeSet<&str> = dag
            .clusters()
            .iter()
            .filter(|c| c.is_cycle())
            .map(|c| c.id())
            .collect();
        export.clusters.retain(|c| cyclic.contains(c.id.as_str()));
        export
            .edges
            .retain(|(from, to)| cyclic.contains(from.as_str()) && cyclic.contains(to.as_str()));
    }
    export
}

/// `purgatory clusters`
pub fn execute(sim: &PurgeSimulator<'_>, json: bool, cycles_only: bool) -> anyhow::Result<()> {
    let dag = sim.dag()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&export(dag, cycles_only))?);
        return Ok(());
    }
    for line in cluster_lines(dag, cycles_only) {
        println!("{line}");
    }
    Ok(())
}
