use crate::classifier::classify;
use crate::config::Config;
use crate::error::Result;
use crate::ledger::ExecutionLedger;
use crate::level::BackupLevel;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum VerdictReason {
    /// The minute matches no level.
    NotScheduled,
    /// Ledger is disabled, so every scheduled minute runs.
    LedgerDisabled,
    /// No previous run is recorded for the level.
    FirstRun,
    /// The previous run fell in an earlier minute.
    NewMinute { previous: DateTime<FixedOffset> },
    /// The level already ran in this minute.
    AlreadyRan {
        level: BackupLevel,
        previous: DateTime<FixedOffset>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub execute: bool,
    /// Set only when `execute` is true.
    pub level: Option<BackupLevel>,
    #[serde(flatten)]
    pub reason: VerdictReason,
}

impl Verdict {
    fn run(level: BackupLevel, reason: VerdictReason) -> Self {
        Self {
            execute: true,
            level: Some(level),
            reason,
        }
    }

    fn skip(reason: VerdictReason) -> Self {
        Self {
            execute: false,
            level: None,
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// should_execute
// ---------------------------------------------------------------------------

/// Whole minutes since the Unix epoch; two instants share a minute iff equal.
fn minute_of(at: &DateTime<FixedOffset>) -> i64 {
    at.timestamp().div_euclid(60)
}

/// Decide whether a backup runs at `at`, and at which level.
///
/// Reads the ledger only when the minute is scheduled. Never records: the
/// caller records after the backup has actually run.
pub fn should_execute(config: &Config, at: DateTime<FixedOffset>) -> Result<Verdict> {
    decide(&ExecutionLedger::from_config(config), at)
}

pub fn decide(ledger: &ExecutionLedger, at: DateTime<FixedOffset>) -> Result<Verdict> {
    let classification = classify(&at);
    let Some(level) = classification.level else {
        return Ok(Verdict::skip(VerdictReason::NotScheduled));
    };

    if !ledger.is_enabled() {
        return Ok(Verdict::run(level, VerdictReason::LedgerDisabled));
    }

    let record = ledger.load()?;
    match record.last(level) {
        None => Ok(Verdict::run(level, VerdictReason::FirstRun)),
        Some(previous) if minute_of(&previous) == minute_of(&at) => {
            Ok(Verdict::skip(VerdictReason::AlreadyRan { level, previous }))
        }
        Some(previous) => Ok(Verdict::run(level, VerdictReason::NewMinute { previous })),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
