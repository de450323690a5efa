use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Application configuration, read from a YAML file.
///
/// ```text
/// AppConfig
///   ├── database: String
///   ├── language: String
///   ├── export_dir: String
///   └── date_formats: DateFormats
///       ├── date
///       ├── time
///       └── datim
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub database: String,
    /// Language recorded on leads when the caller does not supply one
    pub language: String,
    pub export_dir: String,
    pub date_formats: DateFormats,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: "leads.db".to_string(),
            language: "en".to_string(),
            export_dir: ".".to_string(),
            date_formats: DateFormats::default(),
        }
    }
}

/// Numeric date formats (chrono syntax), used both to parse submitted
/// values and to render stored timestamps in exports.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DateFormats {
    pub date: String,
    pub time: String,
    pub datim: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            date: "%Y-%m-%d".to_string(),
            time: "%H:%M".to_string(),
            datim: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl AppConfig {
    /// Load the configuration file, falling back to defaults when it does not exist
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            debug!("No configuration file at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        info!("Loaded configuration from {}", path);
        Ok(config)
    }
}
