//! Wayfarer - travel-planning assistant server
//!
#![doc = "Main entry point for the Wayfarer server binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayfarer::cli::{Cli, Commands};
use wayfarer::config::Config;
use wayfarer::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting Wayfarer server");
            if config.auth.enabled && config.auth.credentials().is_err() {
                tracing::warn!(
                    "GitHub OAuth credentials are incomplete; logins will fail until \
                     GITHUB_CLIENT_ID, GITHUB_CLIENT_SECRET and GITHUB_REDIRECT_URI are set"
                );
            }
            let state = AppState::from_config(&config)?;
            server::serve(config, state).await?;
            Ok(())
        }
        Commands::CheckConfig => {
            println!("{}", config.redacted_summary());
            match config.auth.credentials() {
                Ok(_) => println!("\nGitHub OAuth credentials: complete"),
                Err(e) => println!("\nGitHub OAuth credentials: {}", e),
            }
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wayfarer=info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
