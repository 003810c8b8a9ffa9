use crate::error::{Result, TierbackError};
use crate::level::BackupLevel;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// TierConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSettings {
    pub dir: PathBuf,
    pub keep: u32,
}

/// One entry per [`BackupLevel`]; a missing or misspelled tier fails to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    #[serde(rename = "30m")]
    pub half_hourly: TierSettings,
    #[serde(rename = "3h")]
    pub three_hourly: TierSettings,
    #[serde(rename = "6h")]
    pub six_hourly: TierSettings,
    #[serde(rename = "12h")]
    pub twelve_hourly: TierSettings,
    #[serde(rename = "1d")]
    pub daily: TierSettings,
}

impl TierConfig {
    pub fn get(&self, level: BackupLevel) -> &TierSettings {
        match level {
            BackupLevel::HalfHourly => &self.half_hourly,
            BackupLevel::ThreeHourly => &self.three_hourly,
            BackupLevel::SixHourly => &self.six_hourly,
            BackupLevel::TwelveHourly => &self.twelve_hourly,
            BackupLevel::Daily => &self.daily,
        }
    }

    pub fn get_mut(&mut self, level: BackupLevel) -> &mut TierSettings {
        match level {
            BackupLevel::HalfHourly => &mut self.half_hourly,
            BackupLevel::ThreeHourly => &mut self.three_hourly,
            BackupLevel::SixHourly => &mut self.six_hourly,
            BackupLevel::TwelveHourly => &mut self.twelve_hourly,
            BackupLevel::Daily => &mut self.daily,
        }
    }

    /// Standard layout: `<base>/<level>` with the stock keep counts.
    pub fn under(base: &Path) -> Self {
        let tier = |level: BackupLevel, keep: u32| TierSettings {
            dir: base.join(level.as_str()),
            keep,
        };
        Self {
            half_hourly: tier(BackupLevel::HalfHourly, 5),
            three_hourly: tier(BackupLevel::ThreeHourly, 2),
            six_hourly: tier(BackupLevel::SixHourly, 2),
            twelve_hourly: tier(BackupLevel::TwelveHourly, 2),
            daily: tier(BackupLevel::Daily, 5),
        }
    }
}

// ---------------------------------------------------------------------------
// LockConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<PathBuf>,
    #[serde(default = "default_suffix")]
    pub artifact_suffix: String,
    pub sequence_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_file: Option<PathBuf>,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perf_log: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    pub tiers: TierConfig,
}

fn default_version() -> u32 {
    1
}

fn default_suffix() -> String {
    ".vhdx".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

impl Config {
    /// A config rooted at `base`: tiers, counter and ledger all live beneath it.
    pub fn new(base: &Path) -> Self {
        Self {
            version: 1,
            dry_run: false,
            source_image: None,
            artifact_suffix: default_suffix(),
            sequence_file: base.join("last_id.txt"),
            ledger_file: Some(base.join("last_execution.yaml")),
            lock: LockConfig::default(),
            perf_log: None,
            log_file: None,
            poll_interval_seconds: default_poll_interval(),
            tiers: TierConfig::under(base),
        }
    }

    pub fn tier(&self, level: BackupLevel) -> &TierSettings {
        self.tiers.get(level)
    }

    pub fn keep(&self, level: BackupLevel) -> usize {
        self.tier(level).keep as usize
    }

    pub fn tier_dir(&self, level: BackupLevel) -> &Path {
        &self.tier(level).dir
    }

    /// The ledger location, or `None` when duplicate suppression is disabled.
    pub fn ledger_path(&self) -> Option<&Path> {
        self.ledger_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// The lock location, when locking is enabled and a path is set.
    pub fn lock_path(&self) -> Option<&Path> {
        if !self.lock.enabled {
            return None;
        }
        self.lock
            .path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load from `path`. Relative paths inside the file are resolved against
    /// the file's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TierbackError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let mut cfg: Config = serde_yaml::from_str(&data)?;
        cfg.resolve_relative_to(path);
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())?;
        Ok(())
    }

    fn resolve_relative_to(&mut self, config_path: &Path) {
        let fix = |p: &mut PathBuf| {
            if !p.as_os_str().is_empty() {
                *p = paths::relative_to(config_path, p);
            }
        };
        fix(&mut self.sequence_file);
        for p in [
            self.source_image.as_mut(),
            self.ledger_file.as_mut(),
            self.lock.path.as_mut(),
            self.perf_log.as_mut(),
            self.log_file.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            fix(p);
        }
        for level in BackupLevel::all() {
            fix(&mut self.tiers.get_mut(*level).dir);
        }
    }

    // -----------------------------------------------------------------------
    // Template
    // -----------------------------------------------------------------------

    /// Commented starter file written by `tierback config init`.
    pub fn template() -> &'static str {
        TEMPLATE
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Fail with [`TierbackError::InvalidConfig`] when [`Config::validate`]
    /// reports any error. Warnings are ignored.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TierbackError::InvalidConfig(errors))
        }
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |message: String| ConfigWarning {
            level: WarnLevel::Error,
            message,
        };

        let mut seen: HashMap<&Path, BackupLevel> = HashMap::new();
        for level in BackupLevel::all() {
            let tier = self.tier(*level);
            if tier.keep == 0 {
                warnings.push(error(format!(
                    "tier '{level}' has keep: 0; every artifact would be deleted"
                )));
            }
            if tier.dir.as_os_str().is_empty() {
                warnings.push(error(format!("tier '{level}' has an empty dir")));
                continue;
            }
            if let Some(other) = seen.insert(tier.dir.as_path(), *level) {
                warnings.push(error(format!(
                    "tiers '{other}' and '{level}' share the directory {}",
                    tier.dir.display()
                )));
            }
        }

        if self.sequence_file.as_os_str().is_empty() {
            warnings.push(error("sequence_file is empty".to_string()));
        }

        if !self.artifact_suffix.starts_with('.') {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "artifact_suffix '{}' has no leading dot",
                    self.artifact_suffix
                ),
            });
        }

        if self.lock.enabled && self.lock_path().is_none() {
            warnings.push(error("lock.enabled is true but lock.path is unset".to_string()));
        }

        if self.ledger_path().is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "ledger_file is unset; repeated runs within one minute will not be suppressed"
                    .to_string(),
            });
        }

        if self.poll_interval_seconds == 0 || self.poll_interval_seconds > 60 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "poll_interval_seconds={} (scheduled minutes may be missed outside 1..=60)",
                    self.poll_interval_seconds
                ),
            });
        }

        warnings
    }
}

const TEMPLATE: &str = r#"# tierback configuration
#
# Relative paths are resolved against the directory holding this file.
# Leave dry_run on until the simulated output looks right.
version: 1
dry_run: true

# Disk image copied into the 30m tier on every backup cycle.
# Remove to run retention only.
source_image: image/backup.vhdx

# Only files ending in this suffix are rotated or promoted.
artifact_suffix: .vhdx

# Last issued artifact sequence number (zero-padded, six digits).
sequence_file: state/last_id.txt

# Last run per level; prevents a second run inside the same minute.
# Remove to disable duplicate suppression.
ledger_file: state/last_execution.yaml

lock:
  enabled: true
  path: state/tierback.lock

# Tab-separated timings, one line per cycle.
perf_log: state/perf.tsv

# Log destination. Remove to log to stderr.
# log_file: state/tierback.log

# Daemon polling interval.
poll_interval_seconds: 30

# Promotion path: 30m -> 3h -> 6h -> 12h -> 1d -> deleted
tiers:
  30m:
    dir: backups/30m
    keep: 5
  3h:
    dir: backups/3h
    keep: 2
  6h:
    dir: backups/6h
    keep: 2
  12h:
    dir: backups/12h
    keep: 2
  1d:
    dir: backups/1d
    keep: 5
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
