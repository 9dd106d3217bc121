//! # Events
//!
//! An [`Event`] is one occurrence: a name, a mutable JSON payload and the
//! flags listeners use to talk back to the code that triggered it.
//!
//! ## Propagation
//!
//! Every event starts out propagating. Once [`Event::stop_propagation`] has
//! been called (directly, or because a listener returned `false`) the event
//! stays stopped for the rest of its life.
//!
//! ## Preventing the action
//!
//! [`Event::prevent_action`] is advisory. The registry never reads it; it is
//! there for the caller to inspect once dispatch returns.

use crate::registry::{default_registry, EventRegistry};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Ordered payload carried by an event.
pub type EventData = Map<String, Value>;

/// Something an event can be triggered through without naming a registry.
///
/// The plugin manager binds its context to events it spawns so that a later
/// [`Event::trigger`] reaches the manager's registry.
pub trait TriggerContext: Send + Sync {
    /// Dispatches `event`, after merging `data` into its payload.
    fn trigger(&self, event: &mut Event, data: EventData) -> bool;
}

/// A named occurrence with a mutable payload.
#[derive(Clone)]
pub struct Event {
    name: String,
    data: EventData,
    propagating: bool,
    prevent_action: bool,
    prevent_action_message: String,
    context: Option<Arc<dyn TriggerContext>>,
}

impl Event {
    /// Creates an event with an empty payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, EventData::new())
    }

    /// Creates an event carrying `data`.
    pub fn with_data(name: impl Into<String>, data: EventData) -> Self {
        Self {
            name: name.into(),
            data,
            propagating: true,
            prevent_action: false,
            prevent_action_message: String::new(),
            context: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the event. Listeners are looked up by the name current at
    /// trigger time.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut EventData {
        &mut self.data
    }

    /// Replaces the whole payload.
    pub fn set_data(&mut self, data: EventData) {
        self.data = data;
    }

    /// Merges `data` into the payload. Colliding keys take the new value,
    /// untouched keys are kept.
    pub fn append_data(&mut self, data: EventData) {
        for (key, value) in data {
            self.data.insert(key, value);
        }
    }

    /// Replaces or merges depending on `append`, then returns the payload.
    pub fn update_data(&mut self, data: EventData, append: bool) -> &EventData {
        if append {
            self.append_data(data);
        } else {
            self.set_data(data);
        }
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Sets a single payload entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn is_propagating(&self) -> bool {
        self.propagating
    }

    pub fn is_propagation_stopped(&self) -> bool {
        !self.propagating
    }

    /// Stops this event from reaching any further listener.
    pub fn stop_propagation(&mut self) {
        self.propagating = false;
    }

    /// Suggests to the caller whether the action behind this event should be
    /// halted. Later calls overwrite earlier ones.
    pub fn prevent_action(&mut self, prevent: bool, message: impl Into<String>) {
        self.prevent_action = prevent;
        self.prevent_action_message = message.into();
    }

    pub fn should_prevent_action(&self) -> bool {
        self.prevent_action
    }

    pub fn prevent_action_message(&self) -> &str {
        &self.prevent_action_message
    }

    /// Binds a trigger context, replacing any previous one.
    pub fn bind_context(&mut self, context: Arc<dyn TriggerContext>) -> &mut Self {
        self.context = Some(context);
        self
    }

    /// Builder form of [`bind_context`](Event::bind_context).
    pub fn with_context(mut self, context: Arc<dyn TriggerContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Dispatches the event.
    ///
    /// A bound context wins. Otherwise the event goes to `registry` when one is
    /// given, and to the process-wide [`default_registry`] as a last resort.
    /// Returns whether any listener was registered for the event's name.
    pub fn trigger(&mut self, registry: Option<&EventRegistry>) -> bool {
        if let Some(context) = self.context.clone() {
            return context.trigger(self, EventData::new());
        }
        match registry {
            Some(registry) => registry.trigger(self, EventData::new()),
            None => default_registry().trigger(self, EventData::new()),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("propagating", &self.propagating)
            .field("prevent_action", &self.prevent_action)
            .field("prevent_action_message", &self.prevent_action_message)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}
