//! Plugin system for the Symbiosis event registry.
//!
//! Provides plugin discovery, priority-ordered loading and the binding of each
//! plugin's listeners into the registry owned by a [`PluginManager`].
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use symbiosis_event_system::{Event, EventData, Listener};
//! use symbiosis_plugin_system::{EventMap, Plugin, PluginCatalog, PluginManager, PluginRegistration};
//!
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn registration(self: Arc<Self>) -> PluginRegistration {
//!         EventMap::new()
//!             .on("user.login", Listener::new(|event: &mut Event| {
//!                 event.insert("greeting", json!("hello"));
//!             }))
//!             .into()
//!     }
//! }
//!
//! let mut manager = PluginManager::new()
//!     .with_source(PluginCatalog::new("app").with("greeter", || Arc::new(Greeter) as Arc<dyn Plugin>));
//! manager.load_plugins().unwrap();
//!
//! let mut event = manager.spawn_event("user.login", EventData::new());
//! assert!(event.trigger(None));
//! assert_eq!(event.get("greeting"), Some(&json!("hello")));
//! ```

pub mod binding;
pub mod context;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod plugin;

pub use binding::{bind_plugin_events, EventMap};
pub use context::PluginContext;
pub use discovery::{
    DirectorySource, PluginCatalog, PluginConstructor, PluginDescriptor, PluginManifest,
    PluginSource,
};
pub use error::PluginError;
pub use manager::PluginManager;
pub use plugin::{Plugin, PluginRegistration, RegisterFn, DEFAULT_PLUGIN_PRIORITY};
