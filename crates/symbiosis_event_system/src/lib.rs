//! # Symbiosis Event System
//!
//! In-process, synchronous event dispatch. Named [`Event`]s carry a mutable
//! JSON payload and travel through the listeners registered for their name,
//! any of which may stop the rest from running.
//!
//! ## Core Features
//!
//! - **Priority buckets**: lower priority values run first, ties run in
//!   registration order
//! - **Stoppable propagation**: a listener returns `false` or calls
//!   [`Event::stop_propagation`] to end dispatch early
//! - **Advisory prevention**: listeners can suggest that the caller skip the
//!   action an event announces
//! - **Re-entrant dispatch**: listeners may register, clear and trigger on the
//!   registry that is currently dispatching to them
//! - **Pluggable logging**: every log call goes through an [`EventLogger`]
//!
//! ## Quick Start Example
//!
//! ```rust
//! use symbiosis_event_system::*;
//! use serde_json::json;
//!
//! let registry = EventRegistry::new();
//!
//! registry.on("user.login", |event: &mut Event| {
//!     event.insert("greeted", json!(true));
//! });
//! registry
//!     .register(
//!         "user.login",
//!         Listener::named("audit", |_: &mut Event| false),
//!         PRIORITY_LOW,
//!     )
//!     .unwrap();
//!
//! let mut event = Event::new("user.login");
//! assert!(registry.trigger(&mut event, EventData::new()));
//! assert_eq!(event.get("greeted"), Some(&json!(true)));
//! assert!(event.is_propagation_stopped());
//! ```

pub mod error;
pub mod event;
pub mod listener;
pub mod logging;
pub mod registry;

pub use error::EventError;
pub use event::{Event, EventData, TriggerContext};
pub use listener::{Callback, Listener, ListenerReturn, MethodRef, MethodTarget, Propagation};
pub use logging::{
    default_logger, EventLogger, LogLevel, LogRecord, MemoryLogger, NullLogger, TracingLogger,
};
pub use registry::{
    default_registry, EventNames, EventRegistry, Listeners, Priority, PRIORITY_HIGH,
    PRIORITY_LOW, PRIORITY_MEDIUM,
};

/// Version of the event system crate.
pub const EVENT_SYSTEM_VERSION: &str = env!("CARGO_PKG_VERSION");
