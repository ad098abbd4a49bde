//! Configuration management.
use config::Config;
use serde::Deserialize;

use crate::error::BridgeError;
use crate::surface::LineWrapMode;

/// Top-level application settings, loaded from `config/<name>.toml`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// `env_logger` filter used by the binary.
    pub log_level: String,
    /// Defaults applied to every newly created console.
    pub console: ConsoleDefaults,
    /// Command-history settings.
    pub history: HistorySettings,
}

/// Initial attribute values of a new console surface.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConsoleDefaults {
    /// Output refreshes between cursor resets.
    pub update_refresh_rate: u32,
    /// Display backlog limit; `0` means unbounded.
    pub maximum_block_count: i64,
    /// Initial line wrapping mode.
    pub line_wrap_mode: LineWrapMode,
    /// Initial font family.
    pub font_family: String,
    /// Initial font point size.
    pub font_size: f64,
    /// Initial text rows.
    pub rows: u32,
    /// Initial text columns.
    pub cols: u32,
}

/// Command-history settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum history lines retained per console.
    pub limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            console: ConsoleDefaults::default(),
            history: HistorySettings::default(),
        }
    }
}

impl Default for ConsoleDefaults {
    fn default() -> Self {
        Self {
            update_refresh_rate: 100,
            maximum_block_count: 0,
            line_wrap_mode: LineWrapMode::WidgetWidth,
            font_family: "Monospace".to_string(),
            font_size: 10.0,
            rows: 24,
            cols: 80,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { limit: 500 }
    }
}

impl Settings {
    /// Loads `config/<name>.toml` (default `config/default.toml`).
    pub fn new(config_name: Option<&str>) -> Result<Self, BridgeError> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = Config::builder()
            .add_source(config::File::with_name(&config_path))
            .build()
            .map_err(BridgeError::Config)?;

        s.try_deserialize().map_err(BridgeError::Config)
    }
}
