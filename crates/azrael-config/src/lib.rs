//! Configuration for the Azrael physics coordinator.
//!
//! Provides runtime-configurable tick pacing and worker settings that persist
//! to disk as RON files, with CLI overrides via clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::Config;
pub use error::ConfigError;
