pub mod check;
pub mod config;
pub mod daemon;
pub mod ledger;
pub mod list;
pub mod rotate;
pub mod run;

use anyhow::Context;
use tierback_core::clock::{parse_timestamp, Clock, FixedClock, SystemClock};

/// `--at` pins the clock; otherwise the system clock is used.
pub(crate) fn clock_for(at: Option<&str>) -> anyhow::Result<Box<dyn Clock>> {
    Ok(match at {
        Some(s) => Box::new(FixedClock(
            parse_timestamp(s).with_context(|| format!("invalid --at value '{s}'"))?,
        )),
        None => Box::new(SystemClock),
    })
}
