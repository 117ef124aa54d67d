//! Per-server tool client.
//!
//! The MCP wire protocol stays behind [`ToolEndpoint`]; [`ToolClient`] adds
//! the catalog cache and the initialize-before-use contract.

use crate::error::{McpCliError, Result};
use crate::mcp::registry::ResolvedClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A tool as advertised by a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
}

/// The two remote operations a server exposes.
#[async_trait]
pub trait ToolEndpoint: Send + Sync {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDescriptor>>;
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Opens a [`ToolEndpoint`] for a resolved server.
#[async_trait]
pub trait EndpointConnector: Send + Sync + std::fmt::Debug {
    async fn connect(&self, server: &ResolvedClient) -> anyhow::Result<Box<dyn ToolEndpoint>>;
}

pub struct ToolClient {
    server: ResolvedClient,
    connector: Arc<dyn EndpointConnector>,
    endpoint: Option<Box<dyn ToolEndpoint>>,
    tools: Option<Vec<ToolDescriptor>>,
}

impl std::fmt::Debug for ToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolClient")
            .field("server", &self.server)
            .field("connected", &self.endpoint.is_some())
            .field("tool_count", &self.tools.as_ref().map(Vec::len))
            .finish()
    }
}

impl ToolClient {
    pub fn new(server: ResolvedClient, connector: Arc<dyn EndpointConnector>) -> Self {
        Self {
            server,
            connector,
            endpoint: None,
            tools: None,
        }
    }

    pub fn server(&self) -> &ResolvedClient {
        &self.server
    }

    pub fn name(&self) -> &str {
        &self.server.name
    }

    pub fn is_initialized(&self) -> bool {
        self.tools.is_some()
    }

    /// Connect if needed and (re)fetch the tool catalog.
    ///
    /// Returns the number of tools discovered.
    pub async fn initialize(&mut self) -> Result<usize> {
        if self.endpoint.is_none() {
            tracing::info!(
                name: "mcp.client.connecting",
                server = %self.server.name,
                url = %self.server.url,
                "Connecting to MCP server"
            );
            let endpoint = self.connector.connect(&self.server).await.map_err(|e| {
                McpCliError::Connection {
                    server: self.server.name.clone(),
                    reason: format!("{e:#}"),
                }
            })?;
            self.endpoint = Some(endpoint);
        }

        let endpoint = self.endpoint.as_ref().ok_or_else(|| McpCliError::UninitializedClient {
            server: self.server.name.clone(),
        })?;
        let tools = endpoint
            .list_tools()
            .await
            .map_err(|e| McpCliError::Connection {
                server: self.server.name.clone(),
                reason: format!("tools/list failed: {e:#}"),
            })?;

        let count = tools.len();
        tracing::info!(
            name: "mcp.client.initialized",
            server = %self.server.name,
            tool_count = count,
            "Discovered tools"
        );
        self.tools = Some(tools);
        Ok(count)
    }

    pub fn list_tools(&self) -> Result<&[ToolDescriptor]> {
        self.tools
            .as_deref()
            .ok_or_else(|| McpCliError::UninitializedClient {
                server: self.server.name.clone(),
            })
    }

    /// Exact, case-sensitive lookup.
    pub fn get_tool_info(&self, name: &str) -> Result<&ToolDescriptor> {
        self.list_tools()?
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| McpCliError::ToolNotFound {
                server: self.server.name.clone(),
                tool: name.to_string(),
            })
    }

    /// Invoke `name` with `parameters` as given; the endpoint's result is
    /// returned as-is.
    pub async fn call_tool(
        &self,
        name: &str,
        parameters: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let endpoint = match (&self.tools, &self.endpoint) {
            (Some(_), Some(endpoint)) => endpoint,
            _ => {
                return Err(McpCliError::UninitializedClient {
                    server: self.server.name.clone(),
                });
            }
        };

        tracing::info!(
            name: "mcp.tool.call",
            server = %self.server.name,
            tool = %name,
            "Calling tool"
        );
        endpoint
            .call_tool(name, parameters)
            .await
            .map_err(|e| McpCliError::ToolInvocationFailure {
                server: self.server.name.clone(),
                tool: name.to_string(),
                reason: format!("{e:#}"),
            })
    }
}
