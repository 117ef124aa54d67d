//! Subcommands of the `mcp-cli` binary.
//!
//! Failures that concern a single server or tool are printed and the command
//! returns `Ok`; only a missing or unreadable registry file (and other setup
//! errors) propagate to `main` and produce a non-zero exit.

pub mod display;
pub mod interactive;

use crate::auth::{
    CliDelegate, CredentialResolver, EnvVarSource, Profile, ProfileStore, ResolverChain,
    TokenDelegate,
};
use crate::config::AppConfig;
use crate::error::McpCliError;
use crate::mcp::discovery::{backup_config, discover_tools, update_mcp_config};
use crate::mcp::transport::{RmcpConnector, http_client};
use crate::mcp::vector_search::{
    DEFAULT_FOUND_URLS, find_vector_indexes, registry_for_indexes, write_registry,
};
use crate::mcp::{EndpointConnector, ServerRegistry, ToolClient, ToolDescriptor};
use anyhow::{Context as _, anyhow};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all usable MCP servers
    ListServers,

    /// List tools for a server
    ListTools {
        /// Server name
        server: String,
        /// Show input schemas
        #[arg(long)]
        detailed: bool,
    },

    /// Show detailed information about one tool
    ToolInfo {
        /// Server name
        server: String,
        /// Tool name
        tool: String,
    },

    /// Run a query through the search server's search tool
    Search {
        /// Search query
        query: String,
        /// Server to search (defaults to `search.server`)
        #[arg(long)]
        server: Option<String>,
    },

    /// Call a tool with JSON parameters
    CallTool {
        /// Server name
        server: String,
        /// Tool name
        tool: String,
        /// JSON object with the tool arguments
        parameters: String,
    },

    /// Start an interactive session with a server
    Interactive {
        /// Server name
        server: String,
    },

    /// Discover tools on every server and record them in the registry file
    Discover {
        /// Print the tools without updating the registry file
        #[arg(long)]
        display_only: bool,
        /// Copy the registry file to `<file>.backup` first
        #[arg(long)]
        backup: bool,
    },

    /// List profiles in the credentials file
    ListProfiles,

    /// Check that a credentials profile can authenticate
    ValidateProfile {
        /// Profile name (defaults to the configured default profile)
        name: Option<String>,
        /// Also call the workspace API with the profile's token
        #[arg(long)]
        connect: bool,
    },

    /// Find vector-search indexes with the workspace CLI and draft server entries
    FindVectorUrls {
        /// Where to write the drafted registry file
        #[arg(long, default_value = DEFAULT_FOUND_URLS)]
        output: PathBuf,
    },
}

/// Everything a command needs, built once per invocation.
#[derive(Debug)]
pub struct Context {
    pub config: AppConfig,
    pub profiles: Arc<ProfileStore>,
    pub resolver: CredentialResolver,
    connector: Arc<dyn EndpointConnector>,
    http: reqwest::Client,
}

impl Context {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let delegate = cli_delegate(&config)?;
        let http = http_client()?;
        let connector = Arc::new(RmcpConnector::with_http(http.clone()));
        Self::assemble(config, Arc::new(delegate), connector, http)
    }

    /// Build with explicit collaborators (tests swap in fakes here).
    pub fn with_parts(
        config: AppConfig,
        delegate: Arc<dyn TokenDelegate>,
        connector: Arc<dyn EndpointConnector>,
    ) -> anyhow::Result<Self> {
        Self::assemble(config, delegate, connector, http_client()?)
    }

    fn assemble(
        config: AppConfig,
        delegate: Arc<dyn TokenDelegate>,
        connector: Arc<dyn EndpointConnector>,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let profiles = ProfileStore::load(&config.paths.credentials)
            .context("failed to load credentials file")?
            .with_default_profile(config.auth.default_profile.clone());
        Ok(Self {
            config,
            profiles: Arc::new(profiles),
            resolver: CredentialResolver::new(delegate),
            connector,
            http,
        })
    }

    pub fn chain(&self) -> ResolverChain {
        ResolverChain::standard(
            Arc::clone(&self.profiles),
            self.resolver.clone(),
            EnvVarSource::new(&self.config.auth.env_prefix, &self.config.auth.env_suffix),
        )
    }

    pub async fn registry(&self) -> anyhow::Result<ServerRegistry> {
        let path = &self.config.paths.mcp_config;
        ServerRegistry::load(path, &self.chain(), Arc::clone(&self.connector))
            .await
            .with_context(|| format!("failed to load MCP registry {}", path.display()))
    }
}

fn cli_delegate(config: &AppConfig) -> anyhow::Result<CliDelegate> {
    CliDelegate::from_config(&config.auth).ok_or_else(|| anyhow!("auth.cli_command must name a program"))
}

/// Look up `server` and initialize it, printing why when that fails.
async fn ready_client<'a>(
    registry: &'a mut ServerRegistry,
    server: &str,
) -> Option<&'a mut ToolClient> {
    let Some(client) = registry.get_mut(server) else {
        display::failure(&McpCliError::ServerNotFound { server: server.to_string() }.to_string());
        return None;
    };
    if let Err(e) = client.initialize().await {
        display::failure(&format!("Failed to initialize server '{server}': {e}"));
        return None;
    }
    Some(client)
}

/// First tool whose lowercased name contains one of `markers`.
pub fn find_search_tool<'a>(tools: &'a [ToolDescriptor], markers: &[String]) -> Option<&'a ToolDescriptor> {
    tools.iter().find(|t| {
        let name = t.name.to_lowercase();
        markers.iter().any(|m| name.contains(&m.to_lowercase()))
    })
}

pub(crate) async fn call_and_print(client: &ToolClient, tool: &str, parameters: &str) {
    let params: serde_json::Value = match serde_json::from_str(parameters) {
        Ok(v) => v,
        Err(e) => {
            display::failure(&McpCliError::InvalidParameters(e.to_string()).to_string());
            return;
        }
    };
    match client.call_tool(tool, params).await {
        Ok(result) => display::result(&result),
        Err(e) => display::failure(&e.to_string()),
    }
}

pub(crate) async fn search_and_print(client: &ToolClient, query: &str, markers: &[String]) {
    let tool = match client.list_tools() {
        Ok(tools) => find_search_tool(tools, markers).map(|t| t.name.clone()),
        Err(e) => {
            display::failure(&e.to_string());
            return;
        }
    };
    let Some(tool) = tool else {
        display::failure(&format!(
            "No search tool on server '{}' (looked for: {})",
            client.name(),
            markers.join(", ")
        ));
        return;
    };
    match client.call_tool(&tool, serde_json::json!({ "query": query })).await {
        Ok(result) => display::result(&result),
        Err(e) => display::failure(&format!("Search failed: {e}")),
    }
}

pub async fn run(command: Command, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Command::ListServers => {
            let registry = ctx.registry().await?;
            display::servers(&registry.list_names());
        }

        Command::ListTools { server, detailed } => {
            let mut registry = ctx.registry().await?;
            if let Some(client) = ready_client(&mut registry, &server).await {
                if let Ok(tools) = client.list_tools() {
                    display::tools(tools, detailed);
                }
            }
        }

        Command::ToolInfo { server, tool } => {
            let mut registry = ctx.registry().await?;
            if let Some(client) = ready_client(&mut registry, &server).await {
                match client.get_tool_info(&tool) {
                    Ok(info) => display::tool_info(info),
                    Err(e) => display::failure(&e.to_string()),
                }
            }
        }

        Command::Search { query, server } => {
            let server = server.unwrap_or_else(|| ctx.config.search.server.clone());
            let mut registry = ctx.registry().await?;
            if let Some(client) = ready_client(&mut registry, &server).await {
                search_and_print(client, &query, &ctx.config.search.tool_markers).await;
            }
        }

        Command::CallTool { server, tool, parameters } => {
            let mut registry = ctx.registry().await?;
            if let Some(client) = ready_client(&mut registry, &server).await {
                call_and_print(client, &tool, &parameters).await;
            }
        }

        Command::Interactive { server } => {
            let mut registry = ctx.registry().await?;
            if let Some(client) = ready_client(&mut registry, &server).await {
                interactive::run(client, &ctx.config.search.tool_markers).await?;
            }
        }

        Command::Discover { display_only, backup } => {
            discover(ctx, display_only, backup).await?;
        }

        Command::ListProfiles => display::profiles(&ctx.profiles),

        Command::ValidateProfile { name, connect } => validate_profile(ctx, name, connect).await,

        Command::FindVectorUrls { output } => find_vector_urls(ctx, &output).await?,
    }
    Ok(())
}

async fn validate_profile(ctx: &Context, name: Option<String>, connect: bool) {
    let name = name.unwrap_or_else(|| ctx.profiles.default_name().to_string());
    let Some(profile) = ctx.profiles.get(&name) else {
        display::failure(&format!(
            "Profile '{name}' not found (available: {})",
            ctx.profiles.names().join(", ")
        ));
        return;
    };
    if !ctx.resolver.validate(profile).await {
        display::failure(&format!("Profile '{name}' cannot authenticate"));
        return;
    }
    let host = CredentialResolver::hostname_for(profile).unwrap_or_default();
    display::success(&format!("Profile '{name}' is valid ({host})"));

    if connect {
        if ctx.resolver.test_connection(&ctx.http, profile).await {
            display::success(&format!("Connected to workspace {host}"));
        } else {
            display::failure(&format!("Workspace connection test failed for profile '{name}'"));
        }
    }
}

async fn find_vector_urls(ctx: &Context, output: &Path) -> anyhow::Result<()> {
    let profile = ctx.profiles.default_name();
    let Some(workspace) = ctx.profiles.get_default().and_then(Profile::workspace_url) else {
        display::failure(&format!(
            "Could not determine workspace URL: profile '{profile}' is missing or has no host"
        ));
        return Ok(());
    };

    let cli = cli_delegate(&ctx.config)?;
    display::heading(&format!("Vector search indexes in {workspace}"));
    let indexes = find_vector_indexes(&cli, profile).await;
    if indexes.is_empty() {
        display::failure("No vector search indexes found");
        return Ok(());
    }
    for index in &indexes {
        println!("- {}", index.name);
    }

    let doc = registry_for_indexes(&workspace, profile, &indexes);
    write_registry(output, &doc).with_context(|| format!("failed to write {}", output.display()))?;
    display::found_servers(&doc);
    display::success(&format!("Configuration saved to: {}", output.display()));
    println!(
        "Review it, then copy the servers you want into {}",
        ctx.config.paths.mcp_config.display()
    );
    Ok(())
}

/// Discover tools on every usable server and merge them into the registry
/// file. The backup is only taken when the file is about to be rewritten.
async fn discover(ctx: &Context, display_only: bool, backup: bool) -> anyhow::Result<()> {
    let path = &ctx.config.paths.mcp_config;
    let mut registry = ctx.registry().await?;
    if registry.is_empty() {
        display::failure("No usable MCP servers found in configuration");
        return Ok(());
    }

    let (catalog, summary) = discover_tools(&mut registry).await;
    for (server, error) in &summary.failed {
        display::failure(&format!("Error discovering tools for {server}: {error}"));
    }
    if catalog.is_empty() {
        display::failure("No tools discovered");
        return Ok(());
    }

    display::catalog(&catalog);
    if display_only {
        display::success("Tool discovery complete (display only)");
        return Ok(());
    }

    if backup {
        match backup_config(path) {
            Ok(backup_path) => display::success(&format!("Created backup: {}", backup_path.display())),
            Err(e) => {
                display::failure(&format!("Not updating {}: backup failed: {e}", path.display()));
                return Ok(());
            }
        }
    }

    match update_mcp_config(path, &catalog) {
        Ok(()) => display::success(&format!(
            "Tool discovery complete: {} tools from {}/{} servers written to {}",
            catalog.len(),
            summary.succeeded.len(),
            summary.attempted(),
            path.display()
        )),
        Err(e) => display::failure(&format!("Failed to update {}: {e}", path.display())),
    }
    Ok(())
}
