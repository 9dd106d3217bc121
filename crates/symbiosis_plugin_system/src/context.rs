//! The registry handle a plugin manager shares with the events it spawns.

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use symbiosis_event_system::{
    default_logger, default_registry, Event, EventData, EventLogger, EventRegistry,
    TriggerContext,
};

/// Lazily created registry shared by a manager and its spawned events.
///
/// Clones share the same cell, so a registry created through one clone is
/// seen by all of them.
#[derive(Clone)]
pub struct PluginContext {
    registry: Arc<OnceCell<Arc<EventRegistry>>>,
    logger: Arc<dyn EventLogger>,
}

impl PluginContext {
    /// A context whose registry is created on first use and logs to `logger`.
    pub fn new(logger: Arc<dyn EventLogger>) -> Self {
        Self {
            registry: Arc::new(OnceCell::new()),
            logger,
        }
    }

    /// A context around an existing registry.
    pub fn with_registry(registry: Arc<EventRegistry>) -> Self {
        let logger = registry.logger();
        Self {
            registry: Arc::new(OnceCell::with_value(registry)),
            logger,
        }
    }

    /// Returns the registry, creating it on first access.
    pub fn registry(&self) -> Arc<EventRegistry> {
        self.registry
            .get_or_init(|| Arc::new(EventRegistry::with_logger(self.logger.clone())))
            .clone()
    }

    /// Returns the registry only if it was already created.
    pub fn existing_registry(&self) -> Option<Arc<EventRegistry>> {
        self.registry.get().cloned()
    }

    pub fn logger(&self) -> Arc<dyn EventLogger> {
        self.logger.clone()
    }

    /// Dispatches through this context's registry, or through the
    /// process-wide default registry when none was created yet.
    pub fn trigger(&self, event: &mut Event, data: EventData) -> bool {
        match self.existing_registry() {
            Some(registry) => registry.trigger(event, data),
            None => default_registry().trigger(event, data),
        }
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::new(default_logger())
    }
}

impl TriggerContext for PluginContext {
    fn trigger(&self, event: &mut Event, data: EventData) -> bool {
        PluginContext::trigger(self, event, data)
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("registry", &self.registry.get())
            .finish()
    }
}
