use crate::config::Config;
use crate::error::{Result, TierbackError};
use crate::level::BackupLevel;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// LedgerRecord
// ---------------------------------------------------------------------------

/// On-disk shape of the ledger: the last execution per level.
///
/// Timestamps serialize as RFC 3339 with full sub-second precision, so a
/// load/save cycle reproduces them exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(default)]
    pub last_executions: BTreeMap<BackupLevel, DateTime<FixedOffset>>,
}

impl LedgerRecord {
    pub fn last(&self, level: BackupLevel) -> Option<DateTime<FixedOffset>> {
        self.last_executions.get(&level).copied()
    }
}

// ---------------------------------------------------------------------------
// ExecutionLedger
// ---------------------------------------------------------------------------

/// Persisted last-run timestamps. Disabled when no location is configured:
/// loads are always empty and writes are no-ops.
#[derive(Debug, Clone)]
pub struct ExecutionLedger {
    path: Option<PathBuf>,
}

impl ExecutionLedger {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ledger_path())
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the whole record. A missing file is an empty record, not an error.
    pub fn load(&self) -> Result<LedgerRecord> {
        let Some(path) = &self.path else {
            return Ok(LedgerRecord::default());
        };
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerRecord::default())
            }
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(LedgerRecord::default());
        }
        serde_yaml::from_str(&data).map_err(|source| TierbackError::CorruptLedger {
            path: path.clone(),
            source,
        })
    }

    /// Replace the persisted record, creating parent directories as needed.
    pub fn save(&self, record: &LedgerRecord) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = serde_yaml::to_string(record)?;
        crate::io::atomic_write(path, data.as_bytes()).map_err(|source| {
            TierbackError::LedgerWrite {
                path: path.clone(),
                source,
            }
        })
    }

    /// Read-modify-write of a single level's entry.
    ///
    /// Not atomic across processes: two concurrent writers can lose an update.
    pub fn record_execution(&self, level: BackupLevel, at: DateTime<FixedOffset>) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let mut record = self.load()?;
        record.last_executions.insert(level, at);
        self.save(&record)
    }
}

/// Record that `level` ran at `at`, using the ledger named by `config`.
pub fn record_execution(
    config: &Config,
    level: BackupLevel,
    at: DateTime<FixedOffset>,
) -> Result<()> {
    ExecutionLedger::from_config(config).record_execution(level, at)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
