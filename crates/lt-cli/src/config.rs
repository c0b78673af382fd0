//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Local, Offset};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use lt_core::stats::DEFAULT_HISTORY_LEN;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Page that share links point at; the payload is appended as `?d=`.
    pub share_base_url: String,

    /// Number of entries `lt history` shows by default.
    pub history_limit: usize,

    /// Offset from UTC for displayed and entered times. Local time when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("lt.db"),
            share_base_url: "http://localhost:8080/".to_string(),
            history_limit: DEFAULT_HISTORY_LEN,
            utc_offset_minutes: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (LT_*)
        figment = figment.merge(Env::prefixed("LT_"));

        figment.extract()
    }

    /// The zone used to display and interpret wall-clock times.
    ///
    /// Falls back to UTC if the configured offset is out of range.
    pub fn display_offset(&self) -> FixedOffset {
        match self.utc_offset_minutes {
            Some(minutes) => minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .unwrap_or_else(|| {
                    tracing::warn!(minutes, "utc_offset_minutes out of range, using UTC");
                    Offset::fix(&chrono::Utc)
                }),
            None => Local::now().offset().fix(),
        }
    }
}

/// Returns the platform-specific config directory for lt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lt"))
}

/// Returns the platform-specific data directory for lt.
///
/// On Linux: `~/.local/share/lt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("lt"))
}
