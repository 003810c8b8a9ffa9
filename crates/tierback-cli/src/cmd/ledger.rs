use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use tierback_core::{config::Config, ledger::ExecutionLedger, level::BackupLevel};

#[derive(Subcommand)]
pub enum LedgerSubcommand {
    /// Show the last execution recorded for each level
    Show,
}

pub fn run(config: &Config, subcmd: LedgerSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        LedgerSubcommand::Show => show(config, json),
    }
}

fn show(config: &Config, json: bool) -> anyhow::Result<()> {
    let ledger = ExecutionLedger::from_config(config);
    let record = ledger.load().context("failed to load ledger")?;

    if json {
        let value = serde_json::json!({
            "enabled": ledger.is_enabled(),
            "path": ledger.path(),
            "last_executions": record.last_executions,
        });
        return print_json(&value);
    }

    let Some(path) = ledger.path() else {
        println!("Ledger disabled (no ledger_file configured).");
        return Ok(());
    };
    println!("Ledger: {}", path.display());
    if record.last_executions.is_empty() {
        println!("No executions recorded.");
        return Ok(());
    }

    let rows = BackupLevel::all()
        .iter()
        .map(|level| {
            vec![
                level.to_string(),
                record
                    .last(*level)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["LEVEL", "LAST RUN"], rows);
    Ok(())
}
