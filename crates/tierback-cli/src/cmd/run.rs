use super::clock_for;
use crate::output::print_json;
use crate::report;
use anyhow::Context;
use tierback_core::{config::Config, cycle};

/// `tierback run`: decide, run if due, record.
pub fn run(config: &Config, at: Option<&str>, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let dry_run = dry_run || config.dry_run;
    let clock = clock_for(at)?;

    if dry_run {
        tracing::info!("dry run: no files will be moved, deleted or copied");
    }

    let outcome = cycle::tick(config, clock.as_ref(), dry_run).context("backup cycle failed")?;
    report::log_tick(&outcome);

    if json {
        print_json(&outcome)?;
    } else {
        report::print_tick(&outcome);
    }
    Ok(())
}
