use crate::level::BackupLevel;
use chrono::Timelike;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Classification (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub should_run: bool,
    pub level: Option<BackupLevel>,
}

impl Classification {
    pub fn due(level: BackupLevel) -> Self {
        Self {
            should_run: true,
            level: Some(level),
        }
    }

    pub fn not_due() -> Self {
        Self {
            should_run: false,
            level: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer rule over `(hour, minute)`.
pub struct Rule {
    pub level: BackupLevel,
    pub matches: fn(u32, u32) -> bool,
}

/// Rules in evaluation order: coarsest first, so the longest interval wins.
pub const RULES: [Rule; 5] = [
    Rule {
        level: BackupLevel::Daily,
        matches: |h, m| h == 0 && m == 0,
    },
    Rule {
        level: BackupLevel::TwelveHourly,
        matches: |h, m| (h == 0 || h == 12) && m == 0,
    },
    Rule {
        level: BackupLevel::SixHourly,
        matches: |h, m| h % 6 == 0 && m == 0,
    },
    Rule {
        level: BackupLevel::ThreeHourly,
        matches: |h, m| h % 3 == 0 && m == 0,
    },
    Rule {
        level: BackupLevel::HalfHourly,
        matches: |_, m| m == 0 || m == 30,
    },
];

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Map a wall-clock time to the single tier due at that minute, if any.
///
/// Seconds and below are ignored. Pure: no I/O, safe from any thread.
pub fn classify<T: Timelike>(at: &T) -> Classification {
    let (hour, minute) = (at.hour(), at.minute());
    RULES
        .iter()
        .find(|rule| (rule.matches)(hour, minute))
        .map(|rule| Classification::due(rule.level))
        .unwrap_or_else(Classification::not_due)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
