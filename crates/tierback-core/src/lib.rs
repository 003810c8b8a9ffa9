pub mod artifact;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod error;
pub mod io;
pub mod ledger;
pub mod level;
pub mod lock;
pub mod paths;
pub mod perf;
pub mod retention;
pub mod schedule;
pub mod sequence;

pub use error::{Result, TierbackError};
