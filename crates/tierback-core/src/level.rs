use crate::error::TierbackError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BackupLevel
// ---------------------------------------------------------------------------

/// Retention tier, ordered from finest (`30m`) to coarsest (`1d`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackupLevel {
    #[serde(rename = "30m")]
    HalfHourly,
    #[serde(rename = "3h")]
    ThreeHourly,
    #[serde(rename = "6h")]
    SixHourly,
    #[serde(rename = "12h")]
    TwelveHourly,
    #[serde(rename = "1d")]
    Daily,
}

impl BackupLevel {
    /// The promotion chain, finest first.
    pub fn all() -> &'static [BackupLevel] {
        &[
            BackupLevel::HalfHourly,
            BackupLevel::ThreeHourly,
            BackupLevel::SixHourly,
            BackupLevel::TwelveHourly,
            BackupLevel::Daily,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Next coarser tier. `None` for the terminal `1d` tier.
    pub fn next(self) -> Option<BackupLevel> {
        BackupLevel::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupLevel::HalfHourly => "30m",
            BackupLevel::ThreeHourly => "3h",
            BackupLevel::SixHourly => "6h",
            BackupLevel::TwelveHourly => "12h",
            BackupLevel::Daily => "1d",
        }
    }
}

impl fmt::Display for BackupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackupLevel {
    type Err = TierbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "30m" => Ok(BackupLevel::HalfHourly),
            "3h" => Ok(BackupLevel::ThreeHourly),
            "6h" => Ok(BackupLevel::SixHourly),
            "12h" => Ok(BackupLevel::TwelveHourly),
            "1d" => Ok(BackupLevel::Daily),
            _ => Err(TierbackError::InvalidLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
