//! `mcp-cli` entry point.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use clap::{CommandFactory, Parser};
use dotenvy::dotenv;
use mcp_workspace_cli::cli::{self, Context, display};
use mcp_workspace_cli::config::{AppConfig, Cli};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED). Logs go to stderr so command
    // output stays pipeable; RUST_LOG overrides the default level.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command.clone() else {
        let _ = Cli::command().print_help();
        return;
    };

    let config = match AppConfig::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            display::failure(&format!("Configuration error: {e}"));
            std::process::exit(1);
        }
    };

    tracing::info!(
        name: "cli.config.loaded",
        mcp_config = %config.paths.mcp_config.display(),
        credentials = %config.paths.credentials.display(),
        profile = %config.auth.default_profile,
        "Configuration loaded"
    );

    let result = async {
        let ctx = Context::new(config)?;
        cli::run(command, &ctx).await
    }
    .await;

    if let Err(e) = result {
        display::failure(&format!("Error: {e:#}"));
        std::process::exit(1);
    }
}
