//! Runner configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `atmos.ron` in the working directory, or the file given with `--config`
//! 3. Environment variables prefixed with `ATMOS_`
//!
//! Example environment variable: `ATMOS_ENGINE__MONSTERMOS_ENABLED=false`

use std::path::Path;

use anyhow::{Context, Result};
use atmos_core::AtmosConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Main runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Engine tuning passed to every processing call
    #[serde(default)]
    pub engine: AtmosConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// Benchmark and report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ticks simulated by `--bench`
    pub ticks: usize,
    /// Seed for generated benchmark stations
    pub seed: u64,
    /// Edge length of the generated benchmark station
    pub station_size: usize,
    /// Where reports are written, nothing is written when unset
    pub report_path: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 200,
            seed: 0xA7_05,
            station_size: 64,
            report_path: None,
        }
    }
}

/// Debug/development settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Enable verbose logging
    pub verbose_logging: bool,
    /// Log a line for every simulated tick
    pub log_ticks: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            log_ticks: false,
        }
    }
}

impl AppConfig {
    /// Load configuration with layered priority, reading `atmos.ron` if present
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, using `path` instead of `atmos.ron` when given
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = RunConfig::default();
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("atmos").format(FileFormat::Ron).required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults; engine fields default through serde
            .set_default("run.ticks", defaults.ticks as i64)?
            .set_default("run.seed", defaults.seed as i64)?
            .set_default("run.station_size", defaults.station_size as i64)?
            .set_default("debug.verbose_logging", false)?
            .set_default("debug.log_ticks", false)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (ATMOS_RUN__TICKS, etc.)
            .add_source(
                Environment::with_prefix("ATMOS")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Pretty RON, suitable as a starting `atmos.ron`
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration to RON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.run.ticks, 200);
        assert_eq!(config.run.station_size, 64);
        assert!(config.engine.monstermos_enabled);
        assert!(!config.debug.verbose_logging);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
        write!(
            file,
            "(run: (ticks: 12, seed: 3, station_size: 16), engine: (monstermos_enabled: false, max_tiles_per_call: 40))"
        )
        .unwrap();

        let config = AppConfig::load_from(Some(file.path())).expect("Failed to load config");

        assert_eq!(config.run.ticks, 12);
        assert_eq!(config.run.station_size, 16);
        assert!(!config.engine.monstermos_enabled);
        assert_eq!(config.engine.max_tiles_per_call, 40);
        assert!(config.engine.excited_groups_enabled);
        assert!(!config.debug.log_ticks);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(AppConfig::load_from(Some(&missing)).is_err());
    }

    #[test]
    fn test_ron_dump_round_trips() {
        let config = AppConfig::default();
        let ron = config.to_ron().unwrap();
        let back: AppConfig = ron::from_str(&ron).unwrap();
        assert_eq!(back.run, config.run);
        assert_eq!(back.engine, config.engine);
    }
}
