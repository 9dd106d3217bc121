//! Declarative event maps and the binding step.
//!
//! An [`EventMap`] lists, per event name, the callbacks a plugin wants
//! registered. [`bind_plugin_events`] validates all of them before touching
//! the registry, so a single bad callback registers nothing.
//!
//! Binding is not idempotent. Binding the same map contents twice registers
//! every callback twice.

use symbiosis_event_system::{Callback, EventError, EventRegistry, Priority, PRIORITY_HIGH};

type Bindings = Vec<(Callback, Priority)>;

/// Ordered `event name -> callbacks` declaration.
#[derive(Debug, Clone, Default)]
pub struct EventMap {
    entries: Vec<(String, Bindings)>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one callback for `name` at the default priority.
    pub fn on(self, name: impl Into<String>, callback: impl Into<Callback>) -> Self {
        self.on_with_priority(name, callback, PRIORITY_HIGH)
    }

    /// Adds several callbacks for `name`, kept in the given order.
    pub fn on_all<I>(mut self, name: impl Into<String>, callbacks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Callback>,
    {
        let bindings = self.bindings_for(name.into());
        bindings.extend(
            callbacks
                .into_iter()
                .map(|callback| (callback.into(), PRIORITY_HIGH)),
        );
        self
    }

    pub fn on_with_priority(
        mut self,
        name: impl Into<String>,
        callback: impl Into<Callback>,
        priority: Priority,
    ) -> Self {
        self.bindings_for(name.into())
            .push((callback.into(), priority));
        self
    }

    fn bindings_for(&mut self, name: String) -> &mut Bindings {
        let index = match self.entries.iter().position(|(existing, _)| *existing == name) {
            Some(index) => index,
            None => {
                self.entries.push((name, Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Number of distinct event names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of callbacks across every event name.
    pub fn callback_count(&self) -> usize {
        self.entries.iter().map(|(_, bindings)| bindings.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(Callback, Priority)])> {
        self.entries
            .iter()
            .map(|(name, bindings)| (name.as_str(), bindings.as_slice()))
    }
}

/// Registers every callback of `map` into `registry` and returns how many
/// listeners were added.
pub fn bind_plugin_events(map: EventMap, registry: &EventRegistry) -> Result<usize, EventError> {
    let mut resolved = Vec::with_capacity(map.callback_count());
    for (name, bindings) in map.entries {
        for (callback, priority) in bindings {
            resolved.push((name.clone(), callback.resolve()?, priority));
        }
    }

    let count = resolved.len();
    for (name, listener, priority) in resolved {
        registry.register(name, listener, priority)?;
    }
    Ok(count)
}
