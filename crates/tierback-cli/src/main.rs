mod cmd;
mod logging;
mod output;
mod report;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, ledger::LedgerSubcommand};
use std::path::PathBuf;
use tierback_core::{config::Config, paths};

#[derive(Parser)]
#[command(
    name = "tierback",
    about = "Time-windowed backup rotation: pick the backup level, promote and rotate tiers",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest tierback.yaml in this or a parent directory)
    #[arg(long, global = true, env = paths::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup cycle if the current minute is due
    Run {
        /// Evaluate at this RFC 3339 time instead of now
        #[arg(long)]
        at: Option<String>,

        /// Simulate: report what would happen without touching files
        #[arg(long)]
        dry_run: bool,
    },

    /// Poll the clock and run each due cycle until interrupted
    Daemon {
        /// Write the process id here while running
        #[arg(long)]
        pid_file: Option<PathBuf>,

        /// Simulate every cycle
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which level is due, without running or recording anything
    Check {
        /// Evaluate at this RFC 3339 time instead of now
        #[arg(long)]
        at: Option<String>,
    },

    /// Promote and rotate every tier without taking a new backup
    Rotate {
        /// Simulate: report what would happen without touching files
        #[arg(long)]
        dry_run: bool,
    },

    /// List artifacts in every tier
    List,

    /// Inspect the execution ledger
    Ledger {
        #[command(subcommand)]
        subcommand: LedgerSubcommand,
    },

    /// Create or validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } | Commands::Daemon { .. } | Commands::Rotate { .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = paths::resolve_config(cli.config.as_deref(), &cwd);
    let json = cli.json;

    // Everything except `config` needs a loaded config; its log_file decides
    // where logging goes.
    let load = || -> anyhow::Result<Config> {
        let config = Config::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        logging::init(default_level, config.log_file.as_deref())?;
        Ok(config)
    };

    let result = match cli.command {
        Commands::Run { at, dry_run } => {
            load().and_then(|c| cmd::run::run(&c, at.as_deref(), dry_run, json))
        }
        Commands::Daemon { pid_file, dry_run } => {
            load().and_then(|c| cmd::daemon::run(c, pid_file.as_deref(), dry_run, json))
        }
        Commands::Check { at } => load().and_then(|c| cmd::check::run(&c, at.as_deref(), json)),
        Commands::Rotate { dry_run } => load().and_then(|c| cmd::rotate::run(&c, dry_run, json)),
        Commands::List => load().and_then(|c| cmd::list::run(&c, json)),
        Commands::Ledger { subcommand } => {
            load().and_then(|c| cmd::ledger::run(&c, subcommand, json))
        }
        Commands::Config { subcommand } => logging::init(default_level, None)
            .and_then(|()| cmd::config::run(&config_path, subcommand, json)),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
