use crate::output::print_json_line;
use crate::report;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tierback_core::{clock::SystemClock, config::Config, cycle};
use tokio::time::MissedTickBehavior;

/// Removes the PID file when the daemon stops.
struct PidFile(PathBuf);

impl PidFile {
    fn create(path: &Path) -> anyhow::Result<Self> {
        tierback_core::io::atomic_write(path, format!("{}\n", std::process::id()).as_bytes())
            .with_context(|| format!("failed to write pid file {}", path.display()))?;
        Ok(Self(path.to_path_buf()))
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// `tierback daemon`: tick every `poll_interval_seconds` until Ctrl-C.
///
/// Failed ticks are logged and the loop keeps going.
pub fn run(config: Config, pid_file: Option<&Path>, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let dry_run = dry_run || config.dry_run;
    let period = Duration::from_secs(config.poll_interval_seconds.max(1));
    let _pid = pid_file.map(PidFile::create).transpose()?;

    tracing::info!(
        pid = std::process::id(),
        interval_secs = period.as_secs(),
        dry_run,
        "daemon started"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let poll = async {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let cfg = config.clone();
                let result =
                    tokio::task::spawn_blocking(move || cycle::tick(&cfg, &SystemClock, dry_run))
                        .await;
                match result {
                    Ok(Ok(outcome)) => {
                        report::log_tick(&outcome);
                        if json {
                            if let Err(e) = print_json_line(&outcome) {
                                tracing::warn!(error = %e, "failed to write JSON output");
                            }
                        }
                    }
                    Ok(Err(e)) => tracing::error!(error = %e, "backup cycle failed"),
                    Err(e) => tracing::error!(error = %e, "backup cycle task aborted"),
                }
            }
        };

        tokio::select! {
            _ = poll => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, stopping daemon"),
        }
    });

    Ok(())
}
