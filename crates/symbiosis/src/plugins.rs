//! Built-in plugins shipped with the host.
//!
//! - `greeter` greets the user on login through a method callback.
//! - `audit` registers itself imperatively and records every user event.
//! - `gatekeeper` blocks listed users: it prevents the login and stops the
//!   remaining listeners from running.

use serde_json::{json, Value};
use std::sync::Arc;
use symbiosis_event_system::{
    Event, EventError, EventRegistry, Listener, MethodRef, MethodTarget, Propagation,
    PRIORITY_LOW,
};
use symbiosis_plugin_system::{EventMap, Plugin, PluginCatalog, PluginRegistration};
use tracing::info;

/// Users the gatekeeper turns away.
pub const BLOCKED_USERS: &[&str] = &["banned", "mallory"];

fn user_of(event: &Event) -> String {
    event
        .get("user")
        .and_then(Value::as_str)
        .unwrap_or("guest")
        .to_string()
}

pub struct Greeter;

impl MethodTarget for Greeter {
    fn target_name(&self) -> &str {
        "Greeter"
    }

    fn responds_to(&self, method: &str) -> bool {
        method == "greet"
    }

    fn invoke(&self, _method: &str, event: &mut Event) -> Propagation {
        let greeting = format!("Hello, {}!", user_of(event));
        event.insert("greeting", json!(greeting));
        Propagation::Continue
    }
}

impl Plugin for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn registration(self: Arc<Self>) -> PluginRegistration {
        EventMap::new()
            .on("user.login", MethodRef::new(self, "greet"))
            .into()
    }
}

pub struct Audit;

impl Audit {
    fn register(registry: &Arc<EventRegistry>) -> Result<(), EventError> {
        registry.register(
            ["user.login", "user.logout"],
            Listener::named("audit", |event: &mut Event| {
                info!(event_name = event.name(), user = %user_of(event), "Audited user event");
                let entry = json!(event.name());
                match event.data_mut().get_mut("audit") {
                    Some(Value::Array(trail)) => trail.push(entry),
                    _ => {
                        event.insert("audit", json!([entry]));
                    }
                }
            }),
            PRIORITY_LOW,
        )
    }
}

impl Plugin for Audit {
    fn name(&self) -> &str {
        "audit"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn registration(self: Arc<Self>) -> PluginRegistration {
        PluginRegistration::imperative(Audit::register)
    }
}

pub struct Gatekeeper {
    blocked: Vec<String>,
}

impl Gatekeeper {
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked: blocked.into_iter().map(Into::into).collect(),
        }
    }
}

impl Plugin for Gatekeeper {
    fn name(&self) -> &str {
        "gatekeeper"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn registration(self: Arc<Self>) -> PluginRegistration {
        EventMap::new()
            .on_with_priority(
                "user.login",
                Listener::named("gatekeeper", move |event: &mut Event| {
                    let user = user_of(event);
                    if self.blocked.contains(&user) {
                        event.prevent_action(true, format!("User {user} is blocked."));
                        return false;
                    }
                    true
                }),
                -10,
            )
            .into()
    }
}

/// The host's plugin catalog, limited to `whitelist` when it is non-empty.
pub fn builtin_catalog(namespace: &str, whitelist: &[String]) -> PluginCatalog {
    let allowed = |name: &str| whitelist.is_empty() || whitelist.iter().any(|w| w == name);

    let mut catalog = PluginCatalog::new(namespace);
    if allowed("greeter") {
        catalog.add("greeter", || Arc::new(Greeter) as Arc<dyn Plugin>);
    }
    if allowed("audit") {
        catalog.add("audit", || Arc::new(Audit) as Arc<dyn Plugin>);
    }
    if allowed("gatekeeper") {
        catalog.add("gatekeeper", || {
            Arc::new(Gatekeeper::new(BLOCKED_USERS.iter().copied())) as Arc<dyn Plugin>
        });
    }
    catalog
}
