//! # Event Registry
//!
//! The [`EventRegistry`] owns every `event name -> listeners` mapping and
//! implements the dispatch loop.
//!
//! ## Ordering
//!
//! Listeners for one name live in priority buckets. Buckets are visited in
//! ascending priority (lower runs earlier) and listeners inside a bucket run in
//! registration order. Registering under an existing `(name, priority)` pair
//! appends to the bucket.
//!
//! ## Dispatch
//!
//! [`EventRegistry::trigger`] copies the listener handles for the event's name
//! before calling any of them. A listener may therefore register, clear or
//! trigger on the same registry without disturbing the dispatch in progress;
//! such changes apply from the next trigger on.
//!
//! Listener panics are not caught. They unwind through `trigger` to its caller.

use crate::error::EventError;
use crate::event::{Event, EventData, TriggerContext};
use crate::listener::{Callback, Listener, ListenerReturn, Propagation};
use crate::logging::{default_logger, EventLogger, LogRecord};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Listener priority. Lower values are dispatched earlier.
pub type Priority = i32;

/// Dispatched first. Also the priority used when none is given.
pub const PRIORITY_HIGH: Priority = 0;
pub const PRIORITY_MEDIUM: Priority = 1;
pub const PRIORITY_LOW: Priority = 2;

type Buckets = BTreeMap<Priority, Vec<Listener>>;

static DEFAULT_REGISTRY: Lazy<Arc<EventRegistry>> = Lazy::new(|| Arc::new(EventRegistry::new()));

/// The process-wide fallback registry.
///
/// Only used when an event is triggered without a bound context or an
/// explicit registry. Applications should construct their own registry and
/// pass it around instead of registering here.
pub fn default_registry() -> Arc<EventRegistry> {
    DEFAULT_REGISTRY.clone()
}

/// One or more event names to register a callback under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventNames(Vec<String>);

impl EventNames {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for EventNames {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<&str> for EventNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for EventNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&String> for EventNames {
    fn from(name: &String) -> Self {
        Self(vec![name.clone()])
    }
}

impl From<Vec<String>> for EventNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for EventNames {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for EventNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|name| name.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|name| name.to_string()).collect())
    }
}

/// Snapshot of the listeners for one event, in dispatch order.
#[derive(Debug, Clone)]
pub struct Listeners {
    inner: std::vec::IntoIter<Listener>,
}

impl Listeners {
    fn new(listeners: Vec<Listener>) -> Self {
        Self {
            inner: listeners.into_iter(),
        }
    }
}

impl Iterator for Listeners {
    type Item = Listener;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Listeners {}

/// Stores listeners by event name and priority, and dispatches events to them.
pub struct EventRegistry {
    listeners: DashMap<String, Buckets>,
    logger: Arc<dyn EventLogger>,
}

impl EventRegistry {
    /// Creates an empty registry that logs through `tracing`.
    pub fn new() -> Self {
        Self::with_logger(default_logger())
    }

    /// Creates an empty registry that logs through `logger`.
    pub fn with_logger(logger: Arc<dyn EventLogger>) -> Self {
        Self {
            listeners: DashMap::new(),
            logger,
        }
    }

    pub fn logger(&self) -> Arc<dyn EventLogger> {
        self.logger.clone()
    }

    /// Registers `callback` under every name in `names` at `priority`.
    ///
    /// The callback is validated before anything is stored, so a
    /// [`EventError::NotInvocable`] leaves the registry exactly as it was.
    pub fn register(
        &self,
        names: impl Into<EventNames>,
        callback: impl Into<Callback>,
        priority: Priority,
    ) -> Result<(), EventError> {
        let names = names.into();
        let listener = callback.into().resolve()?;

        for name in names {
            self.insert_listener(name, listener.clone(), priority);
        }
        Ok(())
    }

    /// Registers a closure under `name` at [`PRIORITY_HIGH`].
    pub fn on<F, R>(&self, name: &str, callback: F)
    where
        F: Fn(&mut Event) -> R + Send + Sync + 'static,
        R: ListenerReturn,
    {
        self.insert_listener(name.to_string(), Listener::new(callback), PRIORITY_HIGH);
    }

    fn insert_listener(&self, name: String, listener: Listener, priority: Priority) {
        let record = LogRecord::debug("Listener registered.")
            .field("event_name", &name)
            .field("listener", listener.name())
            .field("priority", priority);

        self.listeners
            .entry(name)
            .or_default()
            .entry(priority)
            .or_default()
            .push(listener);

        self.logger.log(&record);
    }

    /// Moves every listener of `staged` into this registry and returns how
    /// many were moved.
    ///
    /// Each listener lands at the end of its `(name, priority)` bucket, so
    /// the relative order within `staged` is kept. Nothing is logged here;
    /// `staged` already logged each registration.
    pub fn absorb(&self, staged: EventRegistry) -> usize {
        let mut moved = 0;
        for (name, buckets) in staged.listeners {
            let mut target = self.listeners.entry(name).or_default();
            for (priority, listeners) in buckets {
                moved += listeners.len();
                target.entry(priority).or_default().extend(listeners);
            }
        }
        moved
    }

    fn snapshot(&self, name: &str) -> Option<Vec<Listener>> {
        self.listeners.get(name).map(|buckets| {
            buckets
                .values()
                .flat_map(|bucket| bucket.iter().cloned())
                .collect()
        })
    }

    /// Dispatches `event` to the listeners registered under its name.
    ///
    /// `extra` is merged into the payload first, overriding colliding keys.
    /// Returns `false` when nothing was ever registered under the name and
    /// `true` otherwise, even if a listener stopped propagation early.
    pub fn trigger(&self, event: &mut Event, extra: EventData) -> bool {
        if !extra.is_empty() {
            event.append_data(extra);
        }

        let event_name = event.name().to_string();
        let Some(listeners) = self.snapshot(&event_name) else {
            self.logger
                .log(&LogRecord::debug("No event registered.").field("event_name", &event_name));
            return false;
        };

        self.logger.log(
            &LogRecord::debug("Event triggered.")
                .field("event_name", &event_name)
                .field("listeners", listeners.len()),
        );

        for listener in listeners {
            if listener.invoke(event) == Propagation::Stop {
                event.stop_propagation();
            }
            if event.is_propagation_stopped() {
                self.logger.log(
                    &LogRecord::debug("Propagation stopped.")
                        .field("listener", listener.name())
                        .field("event_name", &event_name),
                );
                break;
            }
        }

        true
    }

    /// Dispatches an object that must be an [`Event`] and hands it back.
    pub fn dispatch<'a>(&self, object: &'a mut dyn Any) -> Result<&'a mut Event, EventError> {
        let event = object
            .downcast_mut::<Event>()
            .ok_or(EventError::TypeMismatch {
                expected: std::any::type_name::<Event>(),
            })?;
        self.trigger(event, EventData::new());
        Ok(event)
    }

    /// Dispatches an owned event and returns it after listeners ran.
    pub fn dispatch_event(&self, mut event: Event) -> Event {
        self.trigger(&mut event, EventData::new());
        event
    }

    /// Listeners an object that must be an [`Event`] would be dispatched to.
    pub fn get_listeners_for_event(&self, object: &dyn Any) -> Result<Listeners, EventError> {
        let event = object
            .downcast_ref::<Event>()
            .ok_or(EventError::TypeMismatch {
                expected: std::any::type_name::<Event>(),
            })?;
        Ok(self.listeners_for(event))
    }

    /// Listeners `event` would be dispatched to, in dispatch order.
    ///
    /// Each call takes a fresh snapshot of the registry.
    pub fn listeners_for(&self, event: &Event) -> Listeners {
        Listeners::new(self.snapshot(event.name()).unwrap_or_default())
    }

    /// Removes every listener registered under `name`.
    pub fn clear(&self, name: &str) {
        self.logger
            .log(&LogRecord::debug("Clearing individual event.").field("event_name", name));
        self.listeners.remove(name);
    }

    /// Removes every listener.
    pub fn clear_all(&self) {
        self.logger.log(&LogRecord::debug("Clearing all events."));
        self.listeners.clear();
    }

    pub fn has_listeners(&self, name: &str) -> bool {
        self.listeners.contains_key(name)
    }

    /// Total number of listeners registered under `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .get(name)
            .map(|buckets| buckets.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Names with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .listeners
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerContext for EventRegistry {
    fn trigger(&self, event: &mut Event, data: EventData) -> bool {
        EventRegistry::trigger(self, event, data)
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.event_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{MethodRef, MethodTarget};
    use crate::logging::{LogLevel, MemoryLogger};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, Weak};

    fn recorder(order: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> Listener {
        let order = order.clone();
        Listener::named(label, move |_: &mut Event| {
            order.lock().unwrap().push(label);
        })
    }

    fn counter(calls: &Arc<AtomicUsize>) -> Listener {
        let calls = calls.clone();
        Listener::new(move |_: &mut Event| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn payload(value: Value) -> EventData {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn test_registration_and_callback() {
        let registry = EventRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        registry.register("test.event1", counter(&first), PRIORITY_HIGH).unwrap();
        let shared = counter(&second);
        registry.register("test.event1", shared.clone(), PRIORITY_HIGH).unwrap();
        registry.register("test.event2", shared, PRIORITY_HIGH).unwrap();

        let mut event1 = Event::new("test.event1");
        let mut event2 = Event::new("test.event2");
        assert!(event1.trigger(Some(&registry)));
        assert!(event2.trigger(Some(&registry)));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_register_under_several_names() {
        let registry = EventRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        registry
            .register(["cart.add", "cart.remove"], counter(&calls), PRIORITY_MEDIUM)
            .unwrap();

        assert!(registry.trigger(&mut Event::new("cart.add"), EventData::new()));
        assert!(registry.trigger(&mut Event::new("cart.remove"), EventData::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.event_names(), vec!["cart.add", "cart.remove"]);
    }

    struct Uncallable;

    impl MethodTarget for Uncallable {
        fn responds_to(&self, _method: &str) -> bool {
            false
        }

        fn invoke(&self, _method: &str, _event: &mut Event) -> Propagation {
            Propagation::Continue
        }
    }

    #[test]
    fn test_invalid_registration_leaves_registry_untouched() {
        let registry = EventRegistry::new();
        let result = registry.register(
            ["uncallable", "also.uncallable"],
            MethodRef::new(Arc::new(Uncallable), "uncallable"),
            PRIORITY_HIGH,
        );

        assert!(matches!(result, Err(EventError::NotInvocable { .. })));
        assert!(registry.event_names().is_empty());
        assert!(!registry.trigger(&mut Event::new("uncallable"), EventData::new()));
    }

    #[test]
    fn test_trigger_with_no_listener() {
        let logger = MemoryLogger::new();
        let registry = EventRegistry::with_logger(Arc::new(logger.clone()));
        let mut event = Event::new("test.event1");

        assert!(!event.trigger(Some(&registry)));
        let records = logger.records();
        let last = records.last().unwrap();
        assert_eq!(last.message, "No event registered.");
        assert_eq!(last.level, LogLevel::Debug);
        assert_eq!(last.get("event_name"), Some("test.event1"));
    }

    #[test]
    fn test_clear_event() {
        let registry = EventRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register("clear.me", counter(&calls), PRIORITY_HIGH).unwrap();

        registry.clear("clear.me");

        let mut event = Event::new("clear.me");
        assert!(!registry.trigger(&mut event, EventData::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!registry.has_listeners("clear.me"));
    }

    #[test]
    fn test_clear_unknown_is_noop() {
        let registry = EventRegistry::new();
        registry.on("kept", |_: &mut Event| ());
        registry.clear("never.registered");
        assert_eq!(registry.event_names(), vec!["kept"]);
    }

    #[test]
    fn test_clear_all() {
        let logger = MemoryLogger::new();
        let registry = EventRegistry::with_logger(Arc::new(logger.clone()));
        registry.on("a", |_: &mut Event| ());
        registry.on("b", |_: &mut Event| ());

        registry.clear_all();

        assert!(registry.event_names().is_empty());
        assert!(!registry.trigger(&mut Event::new("a"), EventData::new()));
        assert!(logger.contains("Clearing all events."));
    }

    #[test]
    fn test_stop_propagation_by_returning_false() {
        let registry = EventRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.on("test.event1", |_: &mut Event| false);
        registry.register("test.event1", counter(&calls), PRIORITY_HIGH).unwrap();
        registry.register("test.event1", counter(&calls), PRIORITY_LOW).unwrap();

        let mut event = Event::new("test.event1");
        assert!(event.trigger(Some(&registry)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(event.is_propagation_stopped());
    }

    #[test]
    fn test_stop_propagation_explicitly() {
        let logger = MemoryLogger::new();
        let registry = EventRegistry::with_logger(Arc::new(logger.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                "test.event1",
                Listener::named("stopper", |event: &mut Event| event.stop_propagation()),
                PRIORITY_HIGH,
            )
            .unwrap();
        registry.register("test.event1", counter(&calls), PRIORITY_HIGH).unwrap();

        let mut event = Event::new("test.event1");
        assert!(event.trigger(Some(&registry)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let stopped = logger
            .records()
            .into_iter()
            .find(|record| record.message == "Propagation stopped.")
            .unwrap();
        assert_eq!(stopped.get("listener"), Some("stopper"));
        assert_eq!(stopped.get("event_name"), Some("test.event1"));
    }

    #[test]
    fn test_returning_true_or_nothing_keeps_propagating() {
        let registry = EventRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.on("test.event1", |_: &mut Event| true);
        registry.on("test.event1", |_: &mut Event| None::<bool>);
        registry.register("test.event1", counter(&calls), PRIORITY_LOW).unwrap();

        let mut event = Event::new("test.event1");
        assert!(registry.trigger(&mut event, EventData::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(event.is_propagating());
    }

    #[test]
    fn test_event_name_change_changes_target() {
        let registry = EventRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register("test.event1", counter(&calls), PRIORITY_HIGH).unwrap();

        let mut event = Event::new("test.event1");
        assert!(event.trigger(Some(&registry)));
        event.set_name("test.event2");
        assert!(!event.trigger(Some(&registry)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_suggesting_prevent_action() {
        let registry = EventRegistry::new();
        registry.on("test.event1", |event: &mut Event| {
            event.prevent_action(true, "Reason why should prevent.");
        });

        let mut event = Event::new("test.event1");
        event.trigger(Some(&registry));
        assert!(event.should_prevent_action());
        assert_eq!(event.prevent_action_message(), "Reason why should prevent.");
        assert!(event.is_propagating());
    }

    #[test]
    fn test_priority_order_scenario() {
        let registry = EventRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        registry.register("e1", recorder(&order, "listenerA"), PRIORITY_LOW).unwrap();
        registry.register("e1", recorder(&order, "listenerB"), PRIORITY_HIGH).unwrap();
        registry.register("e1", recorder(&order, "listenerC"), PRIORITY_HIGH).unwrap();

        assert!(registry.trigger(&mut Event::new("e1"), EventData::new()));
        assert_eq!(
            *order.lock().unwrap(),
            vec!["listenerB", "listenerC", "listenerA"]
        );
    }

    #[test]
    fn test_arbitrary_priorities_between_tiers() {
        let registry = EventRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        registry.register("e", recorder(&order, "late"), 50).unwrap();
        registry.register("e", recorder(&order, "early"), -10).unwrap();
        registry.register("e", recorder(&order, "medium"), PRIORITY_MEDIUM).unwrap();
        registry.register("e", recorder(&order, "low"), PRIORITY_LOW).unwrap();

        registry.trigger(&mut Event::new("e"), EventData::new());
        assert_eq!(*order.lock().unwrap(), vec!["early", "medium", "low", "late"]);
    }

    #[test]
    fn test_event_priority_accumulates_payload() {
        let registry = EventRegistry::new();
        let push = |value: i64| {
            move |event: &mut Event| {
                if let Some(Value::Array(order)) = event.data_mut().get_mut("order") {
                    order.push(json!(value));
                }
            }
        };
        registry.register("test.event1", Listener::new(push(3)), PRIORITY_LOW).unwrap();
        registry.register("test.event1", Listener::new(push(1)), PRIORITY_HIGH).unwrap();
        registry.register("test.event1", Listener::new(push(2)), PRIORITY_HIGH).unwrap();

        let mut event = Event::with_data("test.event1", payload(json!({"order": []})));
        registry.trigger(&mut event, EventData::new());
        assert_eq!(event.get("order"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_trigger_merges_extra_data() {
        let registry = EventRegistry::new();
        registry.on("merge", |_: &mut Event| ());

        let mut event = Event::with_data("merge", payload(json!({"keep": 1, "shared": "old"})));
        registry.trigger(&mut event, payload(json!({"shared": "new", "added": true})));

        assert_eq!(
            event.data(),
            &payload(json!({"keep": 1, "shared": "new", "added": true}))
        );
    }

    #[test]
    fn test_extra_data_merged_even_without_listeners() {
        let registry = EventRegistry::new();
        let mut event = Event::new("nobody.listens");
        assert!(!registry.trigger(&mut event, payload(json!({"a": 1}))));
        assert_eq!(event.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_dispatch_returns_mutated_event() {
        let registry = EventRegistry::new();
        registry.on("psr", |event: &mut Event| {
            event.insert("dispatched", json!(true));
        });

        let mut event = Event::new("psr");
        let dispatched = registry.dispatch(&mut event).unwrap();
        assert_eq!(dispatched.get("dispatched"), Some(&json!(true)));

        let owned = registry.dispatch_event(Event::new("psr"));
        assert_eq!(owned.get("dispatched"), Some(&json!(true)));
    }

    #[test]
    fn test_dispatch_rejects_non_events() {
        let registry = EventRegistry::new();
        let mut not_an_event = String::from("psr");

        let err = registry.dispatch(&mut not_an_event).unwrap_err();
        assert!(matches!(err, EventError::TypeMismatch { .. }));

        let err = registry.get_listeners_for_event(&42_u32).unwrap_err();
        assert!(matches!(err, EventError::TypeMismatch { .. }));
    }

    #[test]
    fn test_listeners_for_event_in_dispatch_order() {
        let registry = EventRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        registry.register("e", recorder(&order, "low"), PRIORITY_LOW).unwrap();
        registry.register("e", recorder(&order, "high"), PRIORITY_HIGH).unwrap();

        let event = Event::new("e");
        let names: Vec<String> = registry
            .get_listeners_for_event(&event)
            .unwrap()
            .map(|listener| listener.name().to_string())
            .collect();
        assert_eq!(names, vec!["high", "low"]);

        registry.register("e", recorder(&order, "medium"), PRIORITY_MEDIUM).unwrap();
        assert_eq!(registry.listeners_for(&event).len(), 3);
        assert_eq!(registry.listeners_for(&Event::new("unknown")).len(), 0);
    }

    #[test]
    fn test_register_during_dispatch_applies_next_time() {
        let registry = Arc::new(EventRegistry::new());
        let late_calls = Arc::new(AtomicUsize::new(0));
        let weak: Weak<EventRegistry> = Arc::downgrade(&registry);
        let late = counter(&late_calls);

        registry.on("grow", move |_: &mut Event| {
            if let Some(registry) = weak.upgrade() {
                registry.register("grow", late.clone(), PRIORITY_LOW).unwrap();
            }
        });

        registry.trigger(&mut Event::new("grow"), EventData::new());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.listener_count("grow"), 2);

        registry.trigger(&mut Event::new("grow"), EventData::new());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_during_dispatch_does_not_cut_current_run() {
        let registry = Arc::new(EventRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&registry);

        registry.on("shrink", move |_: &mut Event| {
            if let Some(registry) = weak.upgrade() {
                registry.clear("shrink");
            }
        });
        registry.register("shrink", counter(&calls), PRIORITY_LOW).unwrap();

        assert!(registry.trigger(&mut Event::new("shrink"), EventData::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!registry.trigger(&mut Event::new("shrink"), EventData::new()));
    }

    #[test]
    fn test_reentrant_trigger() {
        let registry = Arc::new(EventRegistry::new());
        let weak = Arc::downgrade(&registry);

        registry.on("inner", |event: &mut Event| {
            let depth = event.get("depth").and_then(Value::as_i64).unwrap_or(0);
            event.insert("depth", json!(depth + 1));
        });
        registry.on("outer", move |event: &mut Event| {
            if let Some(registry) = weak.upgrade() {
                let mut nested = Event::new("inner");
                registry.trigger(&mut nested, EventData::new());
                event.insert("nested", nested.get("depth").cloned().unwrap_or(Value::Null));
            }
        });

        let mut event = Event::new("outer");
        assert!(registry.trigger(&mut event, EventData::new()));
        assert_eq!(event.get("nested"), Some(&json!(1)));
    }

    #[test]
    fn test_reentrant_trigger_of_same_event() {
        let registry = Arc::new(EventRegistry::new());
        let depth = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&registry);

        let seen = depth.clone();
        registry.on("loop", move |_: &mut Event| {
            if seen.fetch_add(1, Ordering::SeqCst) < 3 {
                if let Some(registry) = weak.upgrade() {
                    registry.trigger(&mut Event::new("loop"), EventData::new());
                }
            }
        });
        registry.register("loop", counter(&calls), PRIORITY_LOW).unwrap();

        assert!(registry.trigger(&mut Event::new("loop"), EventData::new()));
        assert_eq!(depth.load(Ordering::SeqCst), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(registry.listener_count("loop"), 2);
        assert_eq!(registry.event_names(), vec!["loop"]);
    }

    #[test]
    fn test_absorb_appends_to_buckets() {
        let registry = EventRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        registry.register("e", recorder(&order, "existing"), PRIORITY_HIGH).unwrap();

        let staged = EventRegistry::new();
        staged.register("e", recorder(&order, "staged.low"), PRIORITY_LOW).unwrap();
        staged.register("e", recorder(&order, "staged.high"), PRIORITY_HIGH).unwrap();
        staged.register("other", recorder(&order, "other"), PRIORITY_HIGH).unwrap();

        assert_eq!(registry.absorb(staged), 3);
        registry.trigger(&mut Event::new("e"), EventData::new());
        assert_eq!(
            *order.lock().unwrap(),
            vec!["existing", "staged.high", "staged.low"]
        );
        assert_eq!(registry.event_names(), vec!["e", "other"]);
    }

    #[test]
    #[should_panic(expected = "listener failure")]
    fn test_listener_panics_reach_the_caller() {
        let registry = EventRegistry::new();
        registry.on("boom", |_: &mut Event| -> () { panic!("listener failure") });
        registry.trigger(&mut Event::new("boom"), EventData::new());
    }

    #[test]
    fn test_trigger_never_stops_propagation_itself() {
        let registry = EventRegistry::new();
        registry.on("e", |_: &mut Event| ());

        let mut event = Event::new("e");
        registry.trigger(&mut event, EventData::new());
        assert!(event.is_propagating());
    }

    #[test]
    fn test_default_registry_is_shared() {
        let first = default_registry();
        let second = default_registry();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_event_names_conversions() {
        assert_eq!(EventNames::from("a").len(), 1);
        assert_eq!(EventNames::from(vec!["a", "b"]).len(), 2);
        assert_eq!(EventNames::from(&["a", "b", "c"][..]).len(), 3);
        assert!(EventNames::from(Vec::<String>::new()).is_empty());
        let names = EventNames::from(["x", "y"]);
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
