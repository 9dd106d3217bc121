//! # Plugin Manager
//!
//! The [`PluginManager`] owns a [`PluginContext`] (and through it an event
//! registry), asks its [`PluginSource`]s which plugins exist, and initializes
//! them in priority order.
//!
//! ## Loading
//!
//! 1. Every source is asked for descriptors, in the order the sources were
//!    added.
//! 2. Disabled plugins are dropped.
//! 3. The batch is sorted by priority. The sort is stable, so plugins with
//!    equal priority keep their discovery order.
//! 4. Each plugin is initialized and added to the running set. Identities
//!    that are already loaded are skipped.
//!
//! Loading is cumulative. Calling [`PluginManager::load_plugins`] again, or
//! [`PluginManager::load_from`] with another source, only adds new plugins.

use crate::binding::bind_plugin_events;
use crate::context::PluginContext;
use crate::discovery::{PluginDescriptor, PluginSource};
use crate::error::PluginError;
use crate::plugin::{Plugin, PluginRegistration};
use std::fmt;
use std::sync::Arc;
use symbiosis_event_system::{
    default_logger, Event, EventData, EventLogger, EventRegistry, LogRecord, Priority,
};

/// A plugin that made it through initialization.
#[derive(Clone)]
struct LoadedPlugin {
    name: String,
    priority: Priority,
    plugin: Arc<dyn Plugin>,
    listener_count: usize,
}

/// Discovers, orders and initializes plugins against one event registry.
pub struct PluginManager {
    context: PluginContext,
    logger: Arc<dyn EventLogger>,
    sources: Vec<Box<dyn PluginSource>>,
    plugins: Vec<LoadedPlugin>,
}

impl PluginManager {
    /// A manager with no sources that logs through `tracing`.
    pub fn new() -> Self {
        Self::with_logger(default_logger())
    }

    /// A manager with no sources that logs through `logger`. The registry is
    /// created on first use and shares the logger.
    pub fn with_logger(logger: Arc<dyn EventLogger>) -> Self {
        Self {
            context: PluginContext::new(logger.clone()),
            logger,
            sources: Vec::new(),
            plugins: Vec::new(),
        }
    }

    /// A manager that binds plugins into `registry` and logs through the
    /// registry's logger.
    pub fn with_registry(registry: Arc<EventRegistry>) -> Self {
        let logger = registry.logger();
        Self {
            context: PluginContext::with_registry(registry),
            logger,
            sources: Vec::new(),
            plugins: Vec::new(),
        }
    }

    pub fn add_source(&mut self, source: impl PluginSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Builder form of [`add_source`](PluginManager::add_source).
    pub fn with_source(mut self, source: impl PluginSource + 'static) -> Self {
        self.add_source(source);
        self
    }

    /// Descriptions of the configured sources, in discovery order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.iter().map(|source| source.describe()).collect()
    }

    /// Discovers plugins from every source and initializes the new ones.
    ///
    /// Returns the identities loaded by this call, in initialization order.
    /// A registration failure stops the load; plugins initialized before it
    /// stay loaded.
    pub fn load_plugins(&mut self) -> Result<Vec<String>, PluginError> {
        let mut discovered = Vec::new();
        for source in &self.sources {
            let found = source.discover(self.logger.as_ref());
            self.logger.log(
                &LogRecord::debug("Plugins discovered.")
                    .field("source", source.describe())
                    .field("count", found.len()),
            );
            discovered.extend(found);
        }
        self.load_descriptors(discovered)
    }

    /// Discovers plugins from `source` only and initializes the new ones.
    pub fn load_from(&mut self, source: &dyn PluginSource) -> Result<Vec<String>, PluginError> {
        let discovered = source.discover(self.logger.as_ref());
        self.load_descriptors(discovered)
    }

    fn load_descriptors(
        &mut self,
        descriptors: Vec<PluginDescriptor>,
    ) -> Result<Vec<String>, PluginError> {
        let mut batch: Vec<PluginDescriptor> = descriptors
            .into_iter()
            .filter(|descriptor| {
                if !descriptor.enabled {
                    self.logger.log(
                        &LogRecord::debug("Skipping disabled plugin.")
                            .field("plugin", &descriptor.name),
                    );
                }
                descriptor.enabled
            })
            .collect();
        batch.sort_by_key(|descriptor| descriptor.priority);

        let mut loaded = Vec::new();
        for descriptor in batch {
            if self.is_loaded(&descriptor.name) {
                self.logger.log(
                    &LogRecord::debug("Plugin already loaded.").field("plugin", &descriptor.name),
                );
                continue;
            }

            let listener_count =
                self.initialize_as(&descriptor.name, descriptor.plugin.clone())?;
            self.plugins.push(LoadedPlugin {
                name: descriptor.name.clone(),
                priority: descriptor.priority,
                plugin: descriptor.plugin,
                listener_count,
            });
            loaded.push(descriptor.name);
        }

        if !loaded.is_empty() {
            self.logger.log(
                &LogRecord::info("Plugins loaded.")
                    .field("count", loaded.len())
                    .field("total", self.plugins.len()),
            );
        }
        Ok(loaded)
    }

    /// Binds `plugin` into this manager's registry without adding it to the
    /// plugin list. Returns the number of listeners it registered.
    pub fn initialize_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<usize, PluginError> {
        let name = plugin.name().to_string();
        self.initialize_as(&name, plugin)
    }

    fn initialize_as(&self, name: &str, plugin: Arc<dyn Plugin>) -> Result<usize, PluginError> {
        self.logger
            .log(&LogRecord::debug("Initializing plugin.").field("plugin", name));

        let registration_error = |source| PluginError::Registration {
            plugin: name.to_string(),
            source,
        };

        match plugin.registration() {
            PluginRegistration::Declarative(map) => {
                bind_plugin_events(map, &self.get_context()).map_err(registration_error)
            }
            PluginRegistration::Imperative(register) => {
                // Staged so that a failing plugin leaves no listeners behind.
                let staging = Arc::new(EventRegistry::with_logger(self.logger.clone()));
                register(&staging).map_err(registration_error)?;
                let staged =
                    Arc::try_unwrap(staging).map_err(|_| PluginError::RegistryRetained {
                        plugin: name.to_string(),
                    })?;
                Ok(self.get_context().absorb(staged))
            }
            PluginRegistration::Unsupported => {
                self.logger.log(
                    &LogRecord::warn("No plugin strategy implemented.").field("plugin", name),
                );
                Ok(0)
            }
        }
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.plugins.iter().any(|loaded| loaded.name == name)
    }

    /// Loaded plugin identities with their priorities, in load order.
    pub fn get_plugin_list(&self) -> Vec<(String, Priority)> {
        self.plugins
            .iter()
            .map(|loaded| (loaded.name.clone(), loaded.priority))
            .collect()
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|loaded| loaded.name == name)
            .map(|loaded| loaded.plugin.clone())
    }

    /// Number of listeners the plugin registered when it was initialized.
    pub fn plugin_listener_count(&self, name: &str) -> Option<usize> {
        self.plugins
            .iter()
            .find(|loaded| loaded.name == name)
            .map(|loaded| loaded.listener_count)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// The manager's registry, created on first access.
    pub fn get_context(&self) -> Arc<EventRegistry> {
        self.context.registry()
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    /// Creates an event bound to this manager, so that [`Event::trigger`]
    /// reaches the manager's registry without naming it.
    pub fn spawn_event(&self, name: impl Into<String>, data: EventData) -> Event {
        Event::with_data(name, data).with_context(Arc::new(self.context.clone()))
    }

    /// Dispatches through the manager's registry, or through the process-wide
    /// default registry when the manager has not created one yet.
    pub fn trigger(&self, event: &mut Event, data: EventData) -> bool {
        self.context.trigger(event, data)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("sources", &self.sources())
            .field("plugins", &self.get_plugin_list())
            .field("context", &self.context)
            .finish()
    }
}
