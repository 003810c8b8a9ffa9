//! Logging and plain-text rendering of core outcomes.

use tierback_core::cycle::{CycleOutcome, CycleReport, TickOutcome};
use tierback_core::retention::{RetentionEvent, RetentionReport};
use tierback_core::schedule::{Verdict, VerdictReason};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn describe_verdict(verdict: &Verdict) -> String {
    match (verdict.level, verdict.reason) {
        (_, VerdictReason::NotScheduled) => "not a scheduled minute".to_string(),
        (_, VerdictReason::AlreadyRan { level, previous }) => format!(
            "{level} already ran this minute (at {})",
            previous.format(TIME_FORMAT)
        ),
        (Some(level), VerdictReason::FirstRun) => format!("{level} due, first run at this level"),
        (Some(level), VerdictReason::LedgerDisabled) => {
            format!("{level} due, no ledger configured")
        }
        (Some(level), VerdictReason::NewMinute { previous }) => format!(
            "{level} due, last run {}",
            previous.format(TIME_FORMAT)
        ),
        (None, _) => "no level".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

pub fn log_retention(report: &RetentionReport) {
    let mode = if report.dry_run { "dry-run" } else { "applied" };
    for event in &report.events {
        match event {
            RetentionEvent::Promoted { from, to, name } => {
                tracing::info!(%from, %to, %name, mode, "promoted")
            }
            RetentionEvent::Superseded { from, to, name } => tracing::info!(
                %from, %to, %name, mode,
                "already present in next tier, removed from source"
            ),
            RetentionEvent::Deleted { level, name } => {
                tracing::info!(%level, %name, mode, "rotated out")
            }
            RetentionEvent::WithinLimit { level, count, keep } => {
                tracing::debug!(%level, count, keep, "within keep count")
            }
            RetentionEvent::Failed { level, error } => {
                tracing::warn!(%level, %error, "retention step failed")
            }
        }
    }
}

pub fn log_tick(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Skipped { at, verdict } => tracing::info!(
            at = %at.format(TIME_FORMAT),
            "no backup: {}",
            describe_verdict(verdict)
        ),
        TickOutcome::Ran { at, verdict, cycle } => {
            tracing::info!(at = %at.format(TIME_FORMAT), "{}", describe_verdict(verdict));
            match cycle {
                CycleOutcome::LockConflict { path } => tracing::warn!(
                    lock = %path.display(),
                    "another run holds the lock, skipping this cycle"
                ),
                CycleOutcome::Completed(report) => log_cycle(report),
            }
        }
    }
}

fn log_cycle(report: &CycleReport) {
    log_retention(&report.retention);
    match &report.saved_to {
        Some(path) => tracing::info!(
            level = %report.level,
            path = %path.display(),
            copy_ms = report.copy_ms,
            "backup saved"
        ),
        None if report.dry_run => tracing::info!(
            level = %report.level,
            artifact = %report.artifact,
            "dry-run: backup would be saved"
        ),
        None => tracing::info!(level = %report.level, "no source_image configured, retention only"),
    }
    if let Some(error) = &report.perf_error {
        tracing::warn!(%error, "failed to append performance log");
    }
    tracing::info!(total_ms = report.total_ms, "cycle finished");
}

// ---------------------------------------------------------------------------
// Plain-text output
// ---------------------------------------------------------------------------

pub fn print_retention(report: &RetentionReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let mut changed = false;
    for event in &report.events {
        let line = match event {
            RetentionEvent::Promoted { from, to, name } => format!("promote {name}: {from} -> {to}"),
            RetentionEvent::Superseded { from, to, name } => {
                format!("drop {name} from {from} (already in {to})")
            }
            RetentionEvent::Deleted { level, name } => format!("delete {name} from {level}"),
            RetentionEvent::Failed { level, error } => format!("failed in {level}: {error}"),
            RetentionEvent::WithinLimit { .. } => continue,
        };
        changed = true;
        println!("  {prefix}{line}");
    }
    if !changed {
        println!("  {prefix}nothing to promote or rotate");
    }
}

pub fn print_tick(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Skipped { at, verdict } => {
            println!(
                "No backup at {}: {}",
                at.format(TIME_FORMAT),
                describe_verdict(verdict)
            );
        }
        TickOutcome::Ran { cycle, .. } => match cycle {
            CycleOutcome::LockConflict { path } => {
                println!("Skipped: lock held at {}", path.display());
            }
            CycleOutcome::Completed(report) => {
                let prefix = if report.dry_run { "[dry-run] " } else { "" };
                println!(
                    "{prefix}Backup {} at {} -> {}",
                    report.level,
                    report.at.format(TIME_FORMAT),
                    report.artifact
                );
                println!("Retention:");
                print_retention(&report.retention);
                if let Some(path) = &report.saved_to {
                    println!("Saved: {}", path.display());
                }
            }
        },
    }
}
