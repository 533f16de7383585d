//! Demo configuration file handling
//!
//! The demo reads an optional `formwork-demo.toml`:
//!
//! ```toml
//! [logging]
//! filter = "formwork_core=debug,info"
//!
//! [connection]
//! host = "db.internal"
//! port = 5432
//!
//! [picker]
//! style = "popup"
//! ```

use anyhow::{Context, Result};
use formwork_components::PickerInputType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level demo configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub connection: ConnectionDefaults,
    #[serde(default)]
    pub picker: PickerConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Values the connection screen starts from
#[derive(Debug, Deserialize, Serialize)]
pub struct ConnectionDefaults {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    22
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PickerConfig {
    /// Presentation style of pickers (default, dialog, popup)
    #[serde(default = "default_picker_style")]
    pub style: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            style: default_picker_style(),
        }
    }
}

fn default_picker_style() -> String {
    "default".to_string()
}

impl DemoConfig {
    /// Load configuration from `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: DemoConfig = toml::from_str(content)?;
        // Fail at startup rather than when the first picker is built
        config.picker_input_type()?;
        Ok(config)
    }

    pub fn picker_input_type(&self) -> Result<PickerInputType> {
        self.picker
            .style
            .parse()
            .with_context(|| format!("Invalid picker style '{}'", self.picker.style))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
