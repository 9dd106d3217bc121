//! # Plugin Discovery
//!
//! Discovery turns some external description of "which plugins exist" into a
//! list of [`PluginDescriptor`]s. The manager only talks to the
//! [`PluginSource`] trait, so sources can be swapped freely.
//!
//! Two sources ship with the crate:
//!
//! - [`PluginCatalog`]: a startup-time list of named plugin constructors.
//!   Loading a catalog instantiates every entry.
//! - [`DirectorySource`]: a directory of `*.toml` manifests. Each manifest
//!   enables the catalog entry named after its file stem and may override
//!   the plugin's `priority` and `enabled` values.
//!
//! Discovery never fails. Problems are logged and the affected plugins are
//! left out.

use crate::error::PluginError;
use crate::plugin::Plugin;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symbiosis_event_system::{EventLogger, LogRecord, Priority};

/// A discovered plugin instance with its load settings resolved.
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Identity used by the manager to deduplicate and list plugins
    pub name: String,
    pub priority: Priority,
    pub enabled: bool,
    pub plugin: Arc<dyn Plugin>,
}

impl PluginDescriptor {
    /// Describes `plugin` using its own name, priority and enabled flag.
    pub fn from_plugin(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            name: plugin.name().to_string(),
            priority: plugin.priority(),
            enabled: plugin.enabled(),
            plugin,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Something that can list plugins for the manager to load.
pub trait PluginSource: Send + Sync {
    /// Human readable description used in logs.
    fn describe(&self) -> String;

    /// Lists the plugins this source knows about. Failures are reported
    /// through `logger` and leave the affected plugins out.
    fn discover(&self, logger: &dyn EventLogger) -> Vec<PluginDescriptor>;
}

/// Creates a fresh plugin instance.
pub type PluginConstructor = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// Named plugin constructors under a common namespace.
///
/// Identities are `namespace::name`, or just `name` when the namespace is
/// empty.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    namespace: String,
    entries: Vec<(String, PluginConstructor)>,
}

impl PluginCatalog {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Vec::new(),
        }
    }

    /// Builder form of [`add`](PluginCatalog::add).
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        self.add(name, constructor);
        self
    }

    /// Adds a constructor. A later entry with the same name replaces the
    /// earlier one.
    pub fn add<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        let name = name.into();
        let constructor: PluginConstructor = Arc::new(constructor);
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = constructor,
            None => self.entries.push((name, constructor)),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full identity of the entry called `name`.
    pub fn identity(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.namespace, name)
        }
    }

    /// Builds the entry called `name`, described under its full identity.
    pub fn instantiate(&self, name: &str) -> Option<PluginDescriptor> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(name, constructor)| {
                PluginDescriptor::from_plugin(constructor()).with_name(self.identity(name))
            })
    }
}

impl PluginSource for PluginCatalog {
    fn describe(&self) -> String {
        format!("catalog {}", self.namespace)
    }

    fn discover(&self, _logger: &dyn EventLogger) -> Vec<PluginDescriptor> {
        self.names()
            .filter_map(|name| self.instantiate(name))
            .collect()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("namespace", &self.namespace)
            .field("entries", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Load settings read from a plugin manifest.
///
/// Unknown keys are rejected, so a misspelt setting surfaces as an invalid
/// manifest instead of being ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginManifest {
    pub priority: Option<Priority>,
    pub enabled: Option<bool>,
}

impl PluginManifest {
    /// Reads and parses the manifest at `path`.
    pub fn from_file(path: &Path) -> Result<Self, PluginError> {
        let content = fs::read_to_string(path).map_err(|source| PluginError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| PluginError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies the overrides this manifest sets.
    pub fn apply(&self, descriptor: PluginDescriptor) -> PluginDescriptor {
        let descriptor = match self.priority {
            Some(priority) => descriptor.with_priority(priority),
            None => descriptor,
        };
        match self.enabled {
            Some(enabled) => descriptor.with_enabled(enabled),
            None => descriptor,
        }
    }
}

/// Plugins enabled by `*.toml` manifests in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
    catalog: PluginCatalog,
}

impl DirectorySource {
    pub fn new(path: impl AsRef<Path>, catalog: PluginCatalog) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            catalog,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Manifest files in the directory, sorted by file name.
    pub fn manifest_paths(&self) -> Result<Vec<PathBuf>, PluginError> {
        let io_error = |source| PluginError::Io {
            path: self.path.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl PluginSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.path.display())
    }

    fn discover(&self, logger: &dyn EventLogger) -> Vec<PluginDescriptor> {
        if !self.path.is_dir() {
            logger.log(
                &LogRecord::warn("Plugin path not a directory.")
                    .field("path", self.path.display()),
            );
            return Vec::new();
        }

        let paths = match self.manifest_paths() {
            Ok(paths) => paths,
            Err(err) => {
                logger.log(
                    &LogRecord::error("Failed to read plugin directory.")
                        .field("path", self.path.display())
                        .field("source", &err),
                );
                return Vec::new();
            }
        };

        let mut descriptors = Vec::new();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                logger.log(
                    &LogRecord::warn("Plugin manifest name is not valid UTF-8.")
                        .field("path", path.display()),
                );
                continue;
            };

            let Some(descriptor) = self.catalog.instantiate(stem) else {
                logger.log(
                    &LogRecord::warn("No plugin registered for manifest.")
                        .field("plugin", stem)
                        .field("path", path.display()),
                );
                continue;
            };

            match PluginManifest::from_file(&path) {
                Ok(manifest) => descriptors.push(manifest.apply(descriptor)),
                Err(err) => logger.log(
                    &LogRecord::error("Invalid plugin manifest.")
                        .field("plugin", &descriptor.name)
                        .field("path", path.display())
                        .field("source", &err),
                ),
            }
        }
        descriptors
    }
}
