//! Configuration loading and typed config structures for a Downlink session.
//!
//! The canonical configuration lives in `downlink-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file at
//! all) yields a playable session.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Environment variable that overrides `world.seed`.
pub const SEED_ENV_VAR: &str = "DOWNLINK_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level session configuration.
///
/// Mirrors the structure of `downlink-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// The player's machine.
    #[serde(default)]
    pub machine: MachineConfig,

    /// Connection tracing.
    #[serde(default)]
    pub trace: TraceConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DOWNLINK_SEED` overrides `world.seed` when set to a valid integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.world.apply_env_overrides();
        Ok(config)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable session name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between ticks. Zero runs flat out.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks. Zero means unbounded.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl WorldConfig {
    /// Apply `DOWNLINK_SEED` if it is set and parses.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var(SEED_ENV_VAR)
            .ok()
            .and_then(|val| val.trim().parse().ok())
        {
            self.seed = seed;
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

/// Player machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MachineConfig {
    /// Number of compute units installed at start.
    #[serde(default = "default_unit_count")]
    pub unit_count: usize,

    /// Speed of each installed unit, in cycles per tick.
    #[serde(default = "default_unit_speed")]
    pub unit_speed: Decimal,

    /// Compute unit slots.
    #[serde(default = "default_max_units")]
    pub max_units: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            unit_count: default_unit_count(),
            unit_speed: default_unit_speed(),
            max_units: default_max_units(),
        }
    }
}

/// Connection tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TraceConfig {
    /// Trace distance of each connection step.
    #[serde(default = "default_distance")]
    pub distance: Decimal,

    /// Trace ticks between progress reports.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u64,

    /// Amount an alerted target traces back per tick.
    #[serde(default = "default_trace_rate")]
    pub trace_rate: Decimal,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            distance: default_distance(),
            sensitivity: default_sensitivity(),
            trace_rate: default_trace_rate(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Downlink".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_max_ticks() -> u64 {
    500
}

const fn default_unit_count() -> usize {
    1
}

fn default_unit_speed() -> Decimal {
    Decimal::from(downlink_sched::unit::DEFAULT_UNIT_SPEED)
}

const fn default_max_units() -> usize {
    downlink_sched::machine::DEFAULT_MAX_UNITS
}

fn default_distance() -> Decimal {
    Decimal::from(downlink_trace::DEFAULT_CONNECTION_DISTANCE)
}

const fn default_sensitivity() -> u64 {
    downlink_trace::DEFAULT_SENSITIVITY
}

fn default_trace_rate() -> Decimal {
    Decimal::ONE
}
