//! Error types raised while loading plugins.

use std::path::PathBuf;
use symbiosis_event_system::EventError;
use thiserror::Error;

/// Errors that can occur while discovering or initializing plugins.
///
/// A missing plugin directory and a plugin with no registration strategy are
/// not errors. Both are logged as warnings and loading carries on.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin handed the registry a callback it could not register.
    #[error("Plugin {plugin} failed to register its events: {source}")]
    Registration {
        plugin: String,
        #[source]
        source: EventError,
    },
    /// An imperative plugin kept a handle to the registry it was given to
    /// register into.
    #[error("Plugin {plugin} kept the registration registry after registering")]
    RegistryRetained { plugin: String },
    /// A plugin manifest is not valid TOML or has fields of the wrong type.
    #[error("Invalid plugin manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// A plugin directory or manifest could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    /// Identity of the plugin the error is about, when there is one.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            PluginError::Registration { plugin, .. }
            | PluginError::RegistryRetained { plugin } => Some(plugin),
            _ => None,
        }
    }
}
