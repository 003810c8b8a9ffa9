use crate::output::print_json;
use crate::report;
use anyhow::Context;
use tierback_core::{config::Config, retention};

/// `tierback rotate`: promote then rotate every tier, no new backup.
pub fn run(config: &Config, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let dry_run = dry_run || config.dry_run;
    let report = retention::retain(config, dry_run).context("retention aborted")?;
    report::log_retention(&report);

    if json {
        print_json(&report)?;
    } else {
        println!("Retention:");
        report::print_retention(&report);
    }

    // Per-file failures are in the report; they do not fail the command.
    Ok(())
}
