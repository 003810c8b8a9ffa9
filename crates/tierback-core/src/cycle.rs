//! One backup cycle, shared by the one-shot and polling front ends.

use crate::artifact::{self, Artifact};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Result, TierbackError};
use crate::ledger::ExecutionLedger;
use crate::level::BackupLevel;
use crate::lock::RunLock;
use crate::perf::{self, PerfSample};
use crate::retention::{self, RetentionReport};
use crate::schedule::{self, Verdict};
use crate::sequence::SequenceCounter;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub level: BackupLevel,
    pub at: DateTime<FixedOffset>,
    pub dry_run: bool,
    pub sequence: u64,
    pub artifact: String,
    /// Where the image was copied; `None` in dry-run or without `source_image`.
    pub saved_to: Option<PathBuf>,
    pub retention: RetentionReport,
    pub copy_ms: u64,
    pub total_ms: u64,
    /// Performance log write failure, if any. Never fatal.
    pub perf_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another run holds the lock; nothing was done.
    LockConflict { path: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tick", rename_all = "snake_case")]
pub enum TickOutcome {
    Skipped {
        at: DateTime<FixedOffset>,
        verdict: Verdict,
    },
    Ran {
        at: DateTime<FixedOffset>,
        verdict: Verdict,
        cycle: CycleOutcome,
    },
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// run_cycle
// ---------------------------------------------------------------------------

/// Run one backup at `level`: lock, allocate a sequence id, promote and rotate
/// every tier, copy the image into the finest tier, log timings.
///
/// Does not touch the ledger; see [`tick`].
pub fn run_cycle(
    config: &Config,
    level: BackupLevel,
    at: DateTime<FixedOffset>,
    dry_run: bool,
) -> Result<CycleOutcome> {
    let started = Instant::now();
    config.ensure_valid()?;

    let _lock = match config.lock_path().filter(|_| !dry_run) {
        Some(path) => match RunLock::acquire(path) {
            Ok(lock) => Some(lock),
            Err(TierbackError::LockHeld(path)) => {
                return Ok(CycleOutcome::LockConflict { path })
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    let counter = SequenceCounter::new(&config.sequence_file);
    let sequence = if dry_run {
        counter.peek_next()?
    } else {
        counter.next()?
    };
    let name = Artifact::file_name(sequence, &at, &config.artifact_suffix);

    // Promotion and rotation must run before the new artifact lands.
    let retention = retention::retain(config, dry_run)?;

    let copy_started = Instant::now();
    let saved_to = match (&config.source_image, dry_run) {
        (Some(source), false) => Some(artifact::save(
            source,
            config.tier_dir(BackupLevel::HalfHourly),
            &name,
        )?),
        _ => None,
    };
    let copy = copy_started.elapsed();
    let total = started.elapsed();

    let perf_error = match (&config.perf_log, dry_run) {
        (Some(path), false) => {
            let elapsed =
                chrono::Duration::from_std(total).unwrap_or_else(|_| chrono::Duration::zero());
            let sample = PerfSample {
                started: at,
                finished: at + elapsed,
                total,
                copy,
            };
            perf::append(path, &sample).err().map(|e| e.to_string())
        }
        _ => None,
    };

    Ok(CycleOutcome::Completed(CycleReport {
        level,
        at,
        dry_run,
        sequence,
        artifact: name,
        saved_to,
        retention,
        copy_ms: millis(copy),
        total_ms: millis(total),
        perf_error,
    }))
}

// ---------------------------------------------------------------------------
// tick
// ---------------------------------------------------------------------------

/// Decide, run if due, and record the run in the ledger.
///
/// Dry runs are recorded too, so repeated simulations within one minute are
/// suppressed the same way real runs are. A lock conflict records nothing.
pub fn tick(config: &Config, clock: &dyn Clock, dry_run: bool) -> Result<TickOutcome> {
    let at = clock.now();
    let verdict = schedule::should_execute(config, at)?;
    let Some(level) = verdict.level.filter(|_| verdict.execute) else {
        return Ok(TickOutcome::Skipped { at, verdict });
    };

    let cycle = run_cycle(config, level, at, dry_run)?;
    if matches!(cycle, CycleOutcome::Completed(_)) {
        ExecutionLedger::from_config(config).record_execution(level, at)?;
    }
    Ok(TickOutcome::Ran { at, verdict, cycle })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
