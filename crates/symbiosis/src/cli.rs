//! Command-line interface handling for the Symbiosis host.
//!
//! Every option except `--config` overrides a value from the configuration
//! file.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the plugin manifest directory
    pub plugin_dir: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the event to trigger
    pub event: Option<String>,
    /// Optional override for the event payload, as a JSON object
    pub data: Option<String>,
}

impl CliArgs {
    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::try_parse_from(std::env::args_os()).unwrap_or_else(|err| err.exit())
    }

    /// Parses an explicit argument list. The first item is the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("symbiosis.toml")),
            plugin_dir: matches.get_one::<String>("plugins").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            event: matches.get_one::<String>("event").cloned(),
            data: matches.get_one::<String>("data").cloned(),
        }
    }
}

fn command() -> Command {
    Command::new("Symbiosis")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads event plugins and triggers an event through them")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("symbiosis.toml"),
        )
        .arg(
            Arg::new("plugins")
                .short('p')
                .long("plugins")
                .value_name("DIR")
                .help("Plugin manifest directory"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("event")
                .short('e')
                .long("event")
                .value_name("NAME")
                .help("Name of the event to trigger"),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("JSON")
                .help("Event payload as a JSON object (e.g., '{\"user\": \"ada\"}')"),
        )
}
