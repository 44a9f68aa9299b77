use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use timer_core::{CityClock, TimerConfig};

use crate::alerts::AlertConfig;

/// Environment variable naming an override config file.
pub const CONFIG_ENV: &str = "TIMEPIECE_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),
    #[error("City catalog is empty")]
    EmptyCatalog,
    #[error("Main city not in catalog: {0}")]
    UnknownMainCity(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub stopwatch_quantum_ms: u64,
    pub countdown_period_ms: u64,
    pub completion_hold_ms: u64,
    pub world_refresh_ms: u64,
    /// Redraw interval while the running stopwatch is on screen.
    pub display_pump_ms: u64,
    pub default_preset: TimerConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    /// Timezone id of the city shown as main at startup.
    pub main_city: String,
    pub cities: Vec<CityClock>,
}

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<AppConfig, ConfigError> {
    let default_config = include_str!("timepiece_config.json");
    load_config_from_str(default_config)
}

/// The file named on the command line, else the one in `TIMEPIECE_CONFIG`,
/// else the embedded default.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok());
    match path {
        Some(path) => {
            log::info!("Loading config from {}", path);
            load_config(path)
        }
        None => load_default_config(),
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("stopwatch_quantum_ms", self.stopwatch_quantum_ms),
            ("countdown_period_ms", self.countdown_period_ms),
            ("world_refresh_ms", self.world_refresh_ms),
            ("display_pump_ms", self.display_pump_ms),
        ];
        if let Some(&(name, _)) = periods.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroPeriod(name));
        }
        if self.cities.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if !self.cities.iter().any(|c| c.timezone_id == self.main_city) {
            return Err(ConfigError::UnknownMainCity(self.main_city.clone()));
        }
        Ok(())
    }
}
