use clap::Parser;
use tracing_subscriber::EnvFilter;

use shroud_client::cli;
use shroud_client::config::ClientConfig;

fn main() {
    let cli = cli::Cli::parse();

    let config = match ClientConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if let Err(e) = cli::run(cli, config) {
        tracing::error!("Fatal error: {}", e);
        std::process::exit(e.exit_code());
    }
}
