use clap::{Parser, Subcommand};

use shroud_bootstrap::bootstrapper::{BootstrapOutcome, ConfigBootstrapper};
use shroud_bootstrap::defaults::DefaultsSource;
use shroud_bootstrap::endpoint::RelayEndpoint;
use shroud_storage::prefs::PrefValue;

use crate::config::{ClientConfig, CONFIG_FILE_NAME};
use crate::error::ClientError;
use crate::output::{info_table, print_success, print_table, style_dim};
use crate::store::open_preferences;

#[derive(Parser)]
#[command(
    name = "shroud",
    about = "Shroud anonymity-relay client: relay configuration bootstrap",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the startup hook: seed relay defaults on first launch
    Start,
    /// Write a default client configuration file
    Init {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: String,
    },
    /// Print every persisted preference
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore the working relay settings from the recorded defaults
    Reset,
}

pub fn run(cli: Cli, config: ClientConfig) -> Result<(), ClientError> {
    match cli.command {
        Command::Start => {
            let endpoint = start(&config)?;
            print_success(&format!("Relay endpoint: {}", endpoint));
        }
        Command::Init { dir } => {
            let path = ClientConfig::init(&dir)?;
            print_success(&format!("Wrote {}", path.display()));
        }
        Command::Show { json } => show(&config, json)?,
        Command::Reset => {
            let endpoint = bootstrapper(&config)?.reset_to_defaults()?;
            print_success(&format!("Relay settings reset to {}", endpoint));
        }
    }
    Ok(())
}

/// Startup hook: make sure relay configuration exists, then return the
/// working endpoint that the rest of the client should use.
pub fn start(config: &ClientConfig) -> Result<RelayEndpoint, ClientError> {
    let bootstrapper = bootstrapper(config)?;
    match bootstrapper.ensure_initialized()? {
        BootstrapOutcome::Seeded(endpoint) => {
            tracing::info!(endpoint = %endpoint, "first launch, relay defaults recorded");
        }
        BootstrapOutcome::AlreadyInitialized => {
            tracing::debug!("using persisted relay configuration");
        }
    }
    Ok(bootstrapper.current_endpoint()?)
}

fn bootstrapper(
    config: &ClientConfig,
) -> Result<ConfigBootstrapper<Box<dyn DefaultsSource>>, ClientError> {
    let prefs = open_preferences(config)?;
    Ok(ConfigBootstrapper::new(config.defaults_source(), prefs))
}

fn show(config: &ClientConfig, json: bool) -> Result<(), ClientError> {
    let prefs = open_preferences(config)?.snapshot()?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = prefs
            .into_iter()
            .map(|(k, v)| (k, json_value(v)))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(map)).unwrap_or_default()
        );
        return Ok(());
    }

    if prefs.is_empty() {
        println!("  {}", style_dim().apply_to("no preferences stored yet"));
        return Ok(());
    }

    let mut table = info_table();
    for (key, value) in &prefs {
        table.add_row(vec![key.clone(), value.to_string()]);
    }
    print_table(&table);
    Ok(())
}

fn json_value(value: PrefValue) -> serde_json::Value {
    match value {
        PrefValue::Bool(b) => serde_json::Value::Bool(b),
        PrefValue::Int(i) => serde_json::Value::from(i),
        PrefValue::Str(s) => serde_json::Value::String(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["shroud", "show", "--json", "--config", "/etc/shroud.toml"]);
        assert_eq!(cli.config, "/etc/shroud.toml");
        assert!(matches!(cli.command, Command::Show { json: true }));
    }

    #[test]
    fn test_json_value() {
        assert_eq!(json_value(PrefValue::Int(443)), serde_json::json!(443));
        assert_eq!(json_value(PrefValue::Bool(false)), serde_json::json!(false));
        assert_eq!(json_value(PrefValue::from("relay")), serde_json::json!("relay"));
    }
}
