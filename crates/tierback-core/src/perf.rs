use crate::error::Result;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::path::Path;
use std::time::Duration;

/// One cycle's timings.
#[derive(Debug, Clone, Copy)]
pub struct PerfSample {
    pub started: DateTime<FixedOffset>,
    pub finished: DateTime<FixedOffset>,
    pub total: Duration,
    pub copy: Duration,
}

impl PerfSample {
    /// `finished \t started-unix-ms \t total-ms \t copy-ms`
    pub fn line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\n",
            self.finished.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.started.timestamp_millis(),
            self.total.as_millis(),
            self.copy.as_millis()
        )
    }
}

pub fn append(path: &Path, sample: &PerfSample) -> Result<()> {
    crate::io::append_text(path, &sample.line())
}
