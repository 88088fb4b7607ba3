//! Command-line argument parsing for the Azrael coordinator.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Azrael coordinator command-line arguments.
///
/// CLI values override settings loaded from `azrael.ron`.
#[derive(Parser, Debug)]
#[command(name = "azrael", about = "Azrael physics coordinator")]
pub struct CliArgs {
    /// Target wall-clock tick period, in milliseconds.
    #[arg(long)]
    pub tick_period_ms: Option<u64>,

    /// Simulation seconds advanced per tick.
    #[arg(long)]
    pub tick_dt: Option<f64>,

    /// Integrator sub-step cap.
    #[arg(long)]
    pub tick_max_substeps: Option<u32>,

    /// Number of worker threads.
    #[arg(long)]
    pub worker_count: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(v) = args.tick_period_ms {
            self.tick_period_ms = v;
        }
        if let Some(v) = args.tick_dt {
            self.tick_dt = v;
        }
        if let Some(v) = args.tick_max_substeps {
            self.tick_max_substeps = v;
        }
        if let Some(v) = args.worker_count {
            self.worker_count = v;
        }
    }
}
