//! Main application entry point for the Symbiosis host.
//!
//! Loads the configuration, sets up logging, loads the built-in plugins that
//! the manifest directory enables, triggers one event and prints the outcome
//! as JSON.

mod cli;
mod config;
mod plugins;

use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use std::path::Path;
use symbiosis_event_system::EventData;
use symbiosis_plugin_system::{DirectorySource, PluginManager};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::CliArgs;
use config::{AppConfig, LoggingSettings};

/// Initialize logging system. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so stdout only carries the report.
fn setup_logging(config: &LoggingSettings) -> anyhow::Result<()> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!("Logging initialized with level: {}", log_level);
    Ok(())
}

fn parse_event_data(raw: &str) -> anyhow::Result<EventData> {
    match serde_json::from_str::<Value>(raw).context("Event data is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("Event data must be a JSON object, got {other}")),
    }
}

/// Loads plugins per `config`, triggers `name` with `data` and describes the
/// outcome.
fn run(config: &AppConfig, name: &str, data: EventData) -> anyhow::Result<Value> {
    let catalog = plugins::builtin_catalog(&config.plugins.namespace, &config.plugins.whitelist);
    let directory = Path::new(&config.plugins.directory);

    let mut manager =
        PluginManager::new().with_source(DirectorySource::new(directory, catalog.clone()));
    let mut loaded = manager.load_plugins()?;

    if !directory.is_dir() {
        warn!(
            "Plugin directory {} not found, loading every built-in plugin",
            directory.display()
        );
        loaded = manager.load_from(&catalog)?;
    }
    info!("Loaded {} plugins: {:?}", loaded.len(), loaded);

    let mut event = manager.spawn_event(name, data);
    let handled = event.trigger(None);

    let plugins: Vec<Value> = manager
        .get_plugin_list()
        .into_iter()
        .map(|(name, priority)| json!({ "name": name, "priority": priority }))
        .collect();

    Ok(json!({
        "event": event.name(),
        "handled": handled,
        "propagation_stopped": event.is_propagation_stopped(),
        "prevent_action": event.should_prevent_action(),
        "prevent_action_message": event.prevent_action_message(),
        "data": event.data(),
        "plugins": plugins,
    }))
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Load configuration first (before logging setup)
    let mut config = AppConfig::load_from_file(&args.config_path)?;

    // Apply CLI overrides
    if let Some(plugin_dir) = &args.plugin_dir {
        config.plugins.directory = plugin_dir.to_string_lossy().to_string();
    }
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if let Some(event) = &args.event {
        config.event.name = event.clone();
    }
    if let Some(raw) = &args.data {
        config.event.data = parse_event_data(raw)?;
    }

    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

    setup_logging(&config.logging)?;
    info!(
        "Config: {} | Plugins: {}",
        args.config_path.display(),
        config.plugins.directory
    );

    let report = run(&config, &config.event.name, config.event.data.clone())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
