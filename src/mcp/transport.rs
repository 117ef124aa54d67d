//! [`ToolEndpoint`] backed by the `rmcp` streamable-HTTP client.

use crate::mcp::client::{EndpointConnector, ToolDescriptor, ToolEndpoint};
use crate::mcp::registry::ResolvedClient;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, Tool},
    service::ServiceExt,
    transport::{
        StreamableHttpClientTransport,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

type DynClientService = rmcp::service::RunningService<
    rmcp::service::RoleClient,
    Box<dyn rmcp::service::DynService<rmcp::service::RoleClient>>,
>;

/// Connects to remote MCP servers over streamable HTTP with bearer auth.
#[derive(Debug, Clone)]
pub struct RmcpConnector {
    http: reqwest::Client,
}

/// HTTP client shared by the MCP transport and workspace API calls.
pub fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

impl RmcpConnector {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_http(http_client()?))
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl EndpointConnector for RmcpConnector {
    async fn connect(&self, server: &ResolvedClient) -> anyhow::Result<Box<dyn ToolEndpoint>> {
        let url = Url::parse(&server.url)
            .with_context(|| format!("invalid url for MCP server '{}': {}", server.name, server.url))?;

        // The transport adds the `Bearer ` prefix itself.
        let config = StreamableHttpClientTransportConfig::with_uri(url.to_string())
            .auth_header(server.token.clone());
        let transport = StreamableHttpClientTransport::with_client(self.http.clone(), config);

        let service = ().into_dyn()
            .serve(transport)
            .await
            .with_context(|| format!("failed to connect MCP server '{}'", server.name))?;

        Ok(Box::new(RmcpEndpoint {
            server: server.name.clone(),
            service,
        }))
    }
}

pub struct RmcpEndpoint {
    server: String,
    service: DynClientService,
}

impl std::fmt::Debug for RmcpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpEndpoint")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

fn descriptor(tool: Tool) -> ToolDescriptor {
    let schema = serde_json::Value::Object((*tool.input_schema).clone());
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.as_deref().unwrap_or_default().to_string(),
        input_schema: Some(schema),
    }
}

#[async_trait]
impl ToolEndpoint for RmcpEndpoint {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .with_context(|| format!("tools/list failed for MCP server '{}'", self.server))?;
        Ok(tools.into_iter().map(descriptor).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let arguments = match arguments {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            other => return Err(anyhow!("tool arguments must be a JSON object, got {other}")),
        };

        let res = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .with_context(|| format!("tools/call failed for {}::{name}", self.server))?;

        Ok(serde_json::to_value(res)?)
    }
}
