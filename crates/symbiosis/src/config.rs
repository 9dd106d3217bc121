//! Configuration management for the Symbiosis host.
//!
//! This module handles loading and validation of the host configuration from
//! TOML files. Command-line overrides are applied by the caller.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Plugin configuration settings
    pub plugins: PluginSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
    /// Event triggered when no event is given on the command line
    #[serde(default)]
    pub event: EventSettings,
}

/// Plugin loading configuration.
///
/// Controls where plugin manifests are read from and which built-in plugins
/// may be loaded at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Directory holding one `<plugin>.toml` manifest per enabled plugin
    pub directory: String,
    /// Namespace prefixed to plugin identities
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Plugin whitelist - if non-empty, only these plugins will be loaded
    #[serde(default)]
    pub whitelist: Vec<String>,
}

/// Default for namespace
fn default_namespace() -> String {
    "symbiosis".to_string()
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

/// The event the host triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Event name
    pub name: String,
    /// Initial payload
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Default for EventSettings {
    fn default() -> Self {
        let mut data = Map::new();
        data.insert("user".to_string(), json!("guest"));
        Self {
            name: "user.login".to_string(),
            data,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plugins: PluginSettings {
                directory: "plugins".to_string(),
                namespace: default_namespace(),
                whitelist: vec![],
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
            event: EventSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            fs::write(path, toml_content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.plugins.directory.is_empty() {
            return Err("Plugin directory cannot be empty".to_string());
        }

        if let Some(name) = self.plugins.whitelist.iter().find(|name| name.trim().is_empty()) {
            return Err(format!("Invalid whitelist entry: {name:?}"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.event.name.is_empty() {
            return Err("Event name cannot be empty".to_string());
        }

        Ok(())
    }
}
