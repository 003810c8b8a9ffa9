use crate::output::{print_json, print_table};
use anyhow::Context;
use tierback_core::{artifact, config::Config, level::BackupLevel};

/// `tierback list`: artifacts per tier, oldest first.
pub fn run(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut tiers = Vec::new();
    for level in BackupLevel::all() {
        let dir = config.tier_dir(*level);
        let artifacts = artifact::list(dir, &config.artifact_suffix)
            .with_context(|| format!("failed to list tier {level}"))?;
        tiers.push((*level, artifacts));
    }

    if json {
        let value: Vec<_> = tiers
            .iter()
            .map(|(level, artifacts)| {
                serde_json::json!({
                    "level": level,
                    "dir": config.tier_dir(*level),
                    "keep": config.keep(*level),
                    "artifacts": artifacts,
                })
            })
            .collect();
        return print_json(&value);
    }

    let rows = tiers
        .iter()
        .map(|(level, artifacts)| {
            vec![
                level.to_string(),
                format!("{}/{}", artifacts.len(), config.keep(*level)),
                artifacts
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| "-".to_string()),
                artifacts
                    .last()
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| "-".to_string()),
                config.tier_dir(*level).display().to_string(),
            ]
        })
        .collect();
    print_table(&["LEVEL", "COUNT", "OLDEST", "NEWEST", "DIR"], rows);
    Ok(())
}
