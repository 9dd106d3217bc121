//! The plugin contract.
//!
//! A plugin tells the manager how it wants to be wired into the registry by
//! returning a [`PluginRegistration`]:
//!
//! - [`PluginRegistration::Declarative`] hands over an [`EventMap`] that the
//!   manager binds on the plugin's behalf.
//! - [`PluginRegistration::Imperative`] hands over a one-shot function that
//!   registers listeners itself.
//! - [`PluginRegistration::Unsupported`] is the default. The manager logs a
//!   warning and treats initialization as a no-op.

use crate::binding::EventMap;
use std::fmt;
use std::sync::Arc;
use symbiosis_event_system::{EventError, EventRegistry, Priority};

/// Priority given to plugins that do not pick one.
pub const DEFAULT_PLUGIN_PRIORITY: Priority = 100;

/// One-shot registration function of an imperative plugin.
///
/// The registry it receives is a staging registry. Its listeners are moved
/// into the manager's registry only when the function returns `Ok`, and the
/// handle must not be kept past the call.
pub type RegisterFn = Box<dyn FnOnce(&Arc<EventRegistry>) -> Result<(), EventError> + Send>;

/// How a plugin registers its listeners.
pub enum PluginRegistration {
    /// Listeners declared up front and bound by the manager
    Declarative(EventMap),
    /// Listeners registered by the plugin itself, then moved into the
    /// manager's registry
    Imperative(RegisterFn),
    /// No way to register anything
    Unsupported,
}

impl PluginRegistration {
    pub fn imperative<F>(register: F) -> Self
    where
        F: FnOnce(&Arc<EventRegistry>) -> Result<(), EventError> + Send + 'static,
    {
        PluginRegistration::Imperative(Box::new(register))
    }

    /// Short label used in logs.
    pub fn strategy(&self) -> &'static str {
        match self {
            PluginRegistration::Declarative(_) => "declarative",
            PluginRegistration::Imperative(_) => "imperative",
            PluginRegistration::Unsupported => "unsupported",
        }
    }
}

impl From<EventMap> for PluginRegistration {
    fn from(map: EventMap) -> Self {
        PluginRegistration::Declarative(map)
    }
}

impl fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginRegistration::Declarative(map) => {
                f.debug_tuple("Declarative").field(map).finish()
            }
            PluginRegistration::Imperative(_) => f.write_str("Imperative(..)"),
            PluginRegistration::Unsupported => f.write_str("Unsupported"),
        }
    }
}

/// A unit of functionality that plugs listeners into an event registry.
///
/// Everything has a default, so the smallest plugin is an empty `impl`. Such a
/// plugin loads fine but registers nothing.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use symbiosis_event_system::{Event, Listener};
/// use symbiosis_plugin_system::{EventMap, Plugin, PluginRegistration};
///
/// struct Welcome;
///
/// impl Plugin for Welcome {
///     fn name(&self) -> &str {
///         "welcome"
///     }
///
///     fn priority(&self) -> i32 {
///         1
///     }
///
///     fn registration(self: Arc<Self>) -> PluginRegistration {
///         EventMap::new()
///             .on("user.login", Listener::new(|_: &mut Event| ()))
///             .into()
///     }
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Identity of the plugin. Defaults to the Rust type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Load order. Lower values are initialized first.
    fn priority(&self) -> Priority {
        DEFAULT_PLUGIN_PRIORITY
    }

    /// Disabled plugins are discovered but never initialized.
    fn enabled(&self) -> bool {
        true
    }

    /// Consumed once, when the manager initializes the plugin.
    fn registration(self: Arc<Self>) -> PluginRegistration {
        PluginRegistration::Unsupported
    }
}
