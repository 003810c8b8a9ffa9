use chrono::{DateTime, FixedOffset, Local};

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local time with the machine's current UTC offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Parse an RFC 3339 timestamp such as `2026-10-19T09:30:00+09:00`.
pub fn parse_timestamp(s: &str) -> crate::Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|_| crate::TierbackError::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn fixed_clock_keeps_offset() {
        let ts = parse_timestamp("2026-10-19T09:30:15+09:00").unwrap();
        let clock = FixedClock(ts);
        assert_eq!(clock.now().hour(), 9);
        assert_eq!(clock.now().offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("09:30").is_err());
    }
}
