//! # Listeners and Callbacks
//!
//! A [`Listener`] is the unit the registry stores and invokes: a named,
//! cheaply clonable callable that receives the [`Event`] being dispatched.
//!
//! What callers hand to [`EventRegistry::register`](crate::EventRegistry::register)
//! is a [`Callback`], which is either a ready listener or a [`MethodRef`]
//! pointing at a named method on some object. Method references are checked
//! when they are registered, never when the event fires.

use crate::error::EventError;
use crate::event::Event;
use std::fmt;
use std::sync::Arc;

/// What a listener asks the dispatcher to do after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    /// Keep invoking the remaining listeners
    Continue,
    /// Halt dispatch after this listener
    Stop,
}

/// Return shapes accepted from listener callbacks.
///
/// Only an explicit `false` (or `Propagation::Stop`) is treated as a request to
/// stop propagation. Every other value has no effect on dispatch.
pub trait ListenerReturn {
    fn into_propagation(self) -> Propagation;
}

impl ListenerReturn for () {
    fn into_propagation(self) -> Propagation {
        Propagation::Continue
    }
}

impl ListenerReturn for bool {
    fn into_propagation(self) -> Propagation {
        if self {
            Propagation::Continue
        } else {
            Propagation::Stop
        }
    }
}

impl ListenerReturn for Option<bool> {
    fn into_propagation(self) -> Propagation {
        match self {
            Some(false) => Propagation::Stop,
            _ => Propagation::Continue,
        }
    }
}

impl ListenerReturn for Propagation {
    fn into_propagation(self) -> Propagation {
        self
    }
}

type ListenerFn = dyn Fn(&mut Event) -> Propagation + Send + Sync;

/// A callable registered against one or more event names.
#[derive(Clone)]
pub struct Listener {
    name: Arc<str>,
    callback: Arc<ListenerFn>,
}

impl Listener {
    /// Wraps a callback that takes the event. The listener is named after the
    /// callback's type.
    pub fn new<F, R>(callback: F) -> Self
    where
        F: Fn(&mut Event) -> R + Send + Sync + 'static,
        R: ListenerReturn,
    {
        Self::named(std::any::type_name::<F>(), callback)
    }

    /// Wraps a callback that takes the event, with an explicit name used in logs.
    pub fn named<F, R>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut Event) -> R + Send + Sync + 'static,
        R: ListenerReturn,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            callback: Arc::new(move |event: &mut Event| callback(event).into_propagation()),
        }
    }

    /// Wraps a callback that ignores the event.
    pub fn without_event<F, R>(callback: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: ListenerReturn,
    {
        Self::named(std::any::type_name::<F>(), move |_: &mut Event| callback())
    }

    /// Name used to identify this listener in log records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the callback against `event`.
    pub fn invoke(&self, event: &mut Event) -> Propagation {
        (self.callback)(event)
    }

    /// True when both handles wrap the same registered callback.
    pub fn same_as(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("name", &self.name).finish()
    }
}

/// An object exposing callable methods by name.
///
/// This is how a plugin offers `(object, "method")` style callbacks: the
/// registry asks [`responds_to`](MethodTarget::responds_to) once at
/// registration time and calls [`invoke`](MethodTarget::invoke) on dispatch.
pub trait MethodTarget: Send + Sync {
    /// Name of the object, used in errors and logs.
    fn target_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn responds_to(&self, method: &str) -> bool;

    fn invoke(&self, method: &str, event: &mut Event) -> Propagation;
}

/// A `(target, method)` pair that still needs to be validated.
#[derive(Clone)]
pub struct MethodRef {
    target: Arc<dyn MethodTarget>,
    method: String,
}

impl MethodRef {
    pub fn new<T>(target: Arc<T>, method: impl Into<String>) -> Self
    where
        T: MethodTarget + 'static,
    {
        Self {
            target,
            method: method.into(),
        }
    }

    pub fn from_dyn(target: Arc<dyn MethodTarget>, method: impl Into<String>) -> Self {
        Self {
            target,
            method: method.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Checks that the target answers to the method and turns the pair into a
    /// listener.
    pub fn resolve(self) -> Result<Listener, EventError> {
        if !self.target.responds_to(&self.method) {
            return Err(EventError::NotInvocable {
                target: self.target.target_name().to_string(),
                method: self.method,
            });
        }

        let name = format!("{}::{}", self.target.target_name(), self.method);
        let MethodRef { target, method } = self;
        Ok(Listener {
            name: Arc::from(name),
            callback: Arc::new(move |event: &mut Event| target.invoke(&method, event)),
        })
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRef")
            .field("target", &self.target.target_name())
            .field("method", &self.method)
            .finish()
    }
}

/// Anything that can be registered as a listener.
#[derive(Debug, Clone)]
pub enum Callback {
    /// A ready-to-call listener
    Function(Listener),
    /// A method looked up on an object at registration time
    Method(MethodRef),
}

impl Callback {
    /// Validates the callback and returns the listener to store.
    pub fn resolve(self) -> Result<Listener, EventError> {
        match self {
            Callback::Function(listener) => Ok(listener),
            Callback::Method(method) => method.resolve(),
        }
    }
}

impl From<Listener> for Callback {
    fn from(listener: Listener) -> Self {
        Callback::Function(listener)
    }
}

impl From<MethodRef> for Callback {
    fn from(method: MethodRef) -> Self {
        Callback::Method(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter;

    impl MethodTarget for Counter {
        fn target_name(&self) -> &str {
            "Counter"
        }

        fn responds_to(&self, method: &str) -> bool {
            method == "increment"
        }

        fn invoke(&self, method: &str, event: &mut Event) -> Propagation {
            if method == "increment" {
                let called = event.get("called").and_then(|v| v.as_i64()).unwrap_or(0);
                event.insert("called", json!(called + 1));
            }
            Propagation::Continue
        }
    }

    #[test]
    fn test_return_shapes() {
        assert_eq!(().into_propagation(), Propagation::Continue);
        assert_eq!(true.into_propagation(), Propagation::Continue);
        assert_eq!(false.into_propagation(), Propagation::Stop);
        assert_eq!(None::<bool>.into_propagation(), Propagation::Continue);
        assert_eq!(Some(true).into_propagation(), Propagation::Continue);
        assert_eq!(Some(false).into_propagation(), Propagation::Stop);
    }

    #[test]
    fn test_listener_invocation() {
        let listener = Listener::named("marker", |event: &mut Event| {
            event.insert("seen", json!(true));
            false
        });
        let mut event = Event::new("test.event1");

        assert_eq!(listener.name(), "marker");
        assert_eq!(listener.invoke(&mut event), Propagation::Stop);
        assert_eq!(event.get("seen"), Some(&json!(true)));
    }

    #[test]
    fn test_listener_without_event() {
        let listener = Listener::without_event(|| ());
        let mut event = Event::new("test.event1");
        assert_eq!(listener.invoke(&mut event), Propagation::Continue);
    }

    #[test]
    fn test_clones_are_the_same_listener() {
        let listener = Listener::new(|_: &mut Event| ());
        let other = Listener::new(|_: &mut Event| ());

        assert!(listener.same_as(&listener.clone()));
        assert!(!listener.same_as(&other));
    }

    #[test]
    fn test_method_ref_resolution() {
        let target = Arc::new(Counter);
        let listener = MethodRef::new(target.clone(), "increment").resolve().unwrap();
        assert_eq!(listener.name(), "Counter::increment");

        let mut event = Event::new("count");
        listener.invoke(&mut event);
        listener.invoke(&mut event);
        assert_eq!(event.get("called"), Some(&json!(2)));

        let err = Callback::from(MethodRef::new(target, "uncallable"))
            .resolve()
            .unwrap_err();
        assert_eq!(
            err,
            EventError::NotInvocable {
                target: "Counter".to_string(),
                method: "uncallable".to_string(),
            }
        );
    }
}
