//! The `azrael` coordinator binary: loads configuration, wires up the
//! object store, worker pool, and tick driver, and runs until interrupted.
//!
//! Run with `cargo run -p azrael-cli -- --worker-count 8` to override the
//! worker pool size for a session.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use azrael_config::{CliArgs, Config};
use azrael_coordinator::{Coordinator, CoordinatorConfig, TickDriver, WorkerSupervisor};
use azrael_dispatch::{DispatchQueue, PackageRegistry};
use clap::Parser;
use tracing::info;

const APP_NAME: &str = "azrael";

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if let Some(level) = &args.log_level {
        // RUST_LOG always wins inside `init_logging`; setting it here just
        // lets `--log-level` act as a convenience override for a single run.
        unsafe {
            std::env::set_var("RUST_LOG", level);
        }
    }
    azrael_log::init_logging();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config =
        Config::load_or_create(&config_dir).context("failed to load or create azrael.ron")?;
    config.apply_cli_overrides(&args);
    config.validate().context("invalid configuration")?;

    info!(
        tick_period_ms = config.tick_period_ms,
        tick_dt = config.tick_dt,
        worker_count = config.worker_count,
        "starting azrael coordinator"
    );

    let registry = Arc::new(PackageRegistry::new());
    let dispatch = DispatchQueue::new();

    let packages_until_exit = if config.worker_packages_until_exit > 0 {
        Some(config.worker_packages_until_exit)
    } else {
        None
    };
    let supervisor = WorkerSupervisor::spawn(
        config.worker_count,
        registry.clone(),
        dispatch.clone(),
        config.force_coupling,
        packages_until_exit,
    );

    let mut coordinator = Coordinator::new(
        registry,
        dispatch,
        CoordinatorConfig {
            dt: config.tick_dt,
            max_substeps: config.tick_max_substeps,
            wait_deadline: Duration::from_millis(config.coordinator_wait_deadline_ms),
        },
    );
    let mut driver = TickDriver::new(Duration::from_millis(config.tick_period_ms));

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("shutdown signal received, draining in-flight ticks");
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("failed to install signal handler")?;

    while !shutdown.load(Ordering::Relaxed) {
        if let Some(report) = driver.poll(&mut coordinator) {
            tracing::debug!(
                tick = report.tick,
                islands = report.islands,
                packages_completed = report.packages_completed,
                packages_abandoned = report.packages_abandoned,
                "tick complete"
            );
        } else {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    info!(ticks = coordinator.tick_count(), "shutting down coordinator");
    supervisor.shutdown();
    Ok(())
}
