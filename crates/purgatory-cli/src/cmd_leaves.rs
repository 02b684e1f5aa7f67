use purgatory_core::PurgeSimulator;
use tracing::debug;

/// One entry per leaf cluster: its members, sorted.
pub fn leaf_lines(sim: &PurgeSimulator<'_>) -> anyhow::Result<Vec<Vec<String>>> {
    let dag = sim.dag()?;
    let leaves = sim.leaves()?;
    debug!(leaves = leaves.len(), "leaves determined");
    Ok(leaves
        .into_iter()
        .map(|c| {
            dag.member_names(c.index())
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .collect())
}

/// `purgatory leaves`
pub fn execute(sim: &PurgeSimulator<'_>, json: bool) -> anyhow::Result<()> {
    let lines = leaf_lines(sim)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }
    for members in &lines {
        println!("{}", members.join(" "));
    }
    Ok(())
}
