use crate::cli::Command;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the registry file, relative to the working directory.
pub const DEFAULT_MCP_CONFIG: &str = ".cursor/mcp.json";
/// Profile used when neither `--profile` nor the environment names one.
pub const DEFAULT_PROFILE: &str = "DEFAULT";
/// Seconds to wait for the delegated token command.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Interact with workspace-hosted MCP servers",
    long_about = None
)]
pub struct Cli {
    /// Registry file (`mcpServers` / `tools`)
    #[arg(short, long, env = "MCP_CONFIG_PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Credentials file with `[profile]` sections
    #[arg(long, env = "DATABRICKS_CONFIG_FILE", global = true)]
    pub credentials: Option<PathBuf>,

    /// Default credentials profile
    #[arg(short, long, env = "DATABRICKS_CONFIG_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Optional settings file (TOML, YAML or JSON)
    #[arg(long, env = "MCP_CLI_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    pub mcp_config: PathBuf,
    pub credentials: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub default_profile: String,
    /// Program (plus leading args) invoked as `<cmd> auth token --profile <name> --output JSON`.
    pub cli_command: Vec<String>,
    pub timeout_secs: u64,
    /// Per-server token variables are named `<env_prefix><SERVER><env_suffix>`.
    pub env_prefix: String,
    pub env_suffix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub server: String,
    pub tool_markers: Vec<String>,
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Layer defaults, the optional settings file, `MCP_CLI_*` variables and
    /// finally the CLI flags (highest priority).
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("paths.mcp_config", DEFAULT_MCP_CONFIG)?
            .set_default(
                "paths.credentials",
                path_string(&default_credentials_path()),
            )?
            .set_default("auth.default_profile", DEFAULT_PROFILE)?
            .set_default("auth.cli_command", vec!["databricks"])?
            .set_default("auth.timeout_secs", DEFAULT_AUTH_TIMEOUT_SECS)?
            .set_default("auth.env_prefix", "MCP_")?
            .set_default("auth.env_suffix", "_TOKEN")?
            .set_default("search.server", "wikipedia-search")?
            .set_default("search.tool_markers", vec!["wikipedia", "docsearch"])?;

        if let Some(settings) = &cli.settings {
            builder = builder.add_source(File::from(settings.as_path()).required(true));
        }

        // E.g. MCP_CLI_AUTH__TIMEOUT_SECS=10, MCP_CLI_AUTH__CLI_COMMAND="databricks --debug"
        builder = builder.add_source(
            Environment::with_prefix("MCP_CLI")
                .prefix_separator("_")
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("auth.cli_command")
                .with_list_parse_key("search.tool_markers")
                .try_parsing(true),
        );

        if let Some(path) = &cli.config {
            builder = builder.set_override("paths.mcp_config", path_string(path))?;
        }
        if let Some(path) = &cli.credentials {
            builder = builder.set_override("paths.credentials", path_string(path))?;
        }
        if let Some(profile) = &cli.profile {
            builder = builder.set_override("auth.default_profile", profile.as_str())?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.auth.cli_command.is_empty() {
            return Err(config::ConfigError::Message(
                "auth.cli_command must name a program".to_string(),
            ));
        }
        Ok(cfg)
    }

    /// Backup location used by `discover --backup`.
    pub fn backup_path(&self) -> PathBuf {
        crate::mcp::discovery::backup_path_for(&self.paths.mcp_config)
    }
}

/// `~/.databrickscfg`, or the bare file name when no home directory is known.
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir().map_or_else(
        || PathBuf::from(".databrickscfg"),
        |home| home.join(".databrickscfg"),
    )
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
