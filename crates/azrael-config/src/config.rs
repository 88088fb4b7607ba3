//! Coordinator configuration with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Target wall-clock tick period, in milliseconds.
    pub tick_period_ms: u64,
    /// Simulation seconds advanced per tick.
    pub tick_dt: f64,
    /// Integrator sub-step cap.
    pub tick_max_substeps: u32,
    /// Multiplier applied to central force inside the worker.
    pub force_coupling: f64,
    /// Number of worker threads/processes.
    pub worker_count: usize,
    /// If > 0, workers self-terminate after this many packages.
    pub worker_packages_until_exit: u64,
    /// Maximum wait for workers per tick, in milliseconds.
    pub coordinator_wait_deadline_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            tick_dt: 0.1,
            tick_max_substeps: 10,
            force_coupling: 0.01,
            worker_count: 4,
            worker_packages_until_exit: 0,
            coordinator_wait_deadline_ms: 50,
        }
    }
}

impl Config {
    /// Validates structural invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_dt <= 0.0 {
            return Err(ConfigError::Invalid("tick_dt must be positive".into()));
        }
        if self.tick_max_substeps == 0 {
            return Err(ConfigError::Invalid(
                "tick_max_substeps must be positive".into(),
            ));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be positive".into()));
        }
        Ok(())
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("azrael.ron");

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            tracing::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            tracing::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `azrael.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("azrael.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}
