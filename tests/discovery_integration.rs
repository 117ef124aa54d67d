use async_trait::async_trait;
use mcp_workspace_cli::auth::{
    CredentialResolver, EnvVarSource, ProfileStore, ResolverChain, TokenDelegate, TokenOrigin,
};
use mcp_workspace_cli::mcp::discovery::{discover_all_tools, update_mcp_config};
use mcp_workspace_cli::mcp::{
    EndpointConnector, ResolvedClient, ServerRegistry, ToolDescriptor, ToolEndpoint,
};
use mcp_workspace_cli::McpCliError;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct NoDelegate;

#[async_trait]
impl TokenDelegate for NoDelegate {
    async fn fetch_token(&self, profile: &str) -> mcp_workspace_cli::Result<String> {
        Err(McpCliError::DelegationFailure {
            profile: profile.to_string(),
            reason: "delegation disabled in tests".to_string(),
        })
    }
}

struct TwoToolEndpoint;

#[async_trait]
impl ToolEndpoint for TwoToolEndpoint {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
        Ok(vec![
            ToolDescriptor {
                name: "cat__schema__wikipedia".to_string(),
                description: "Search Wikipedia chunks".to_string(),
                input_schema: Some(json!({
                    "type": "object",
                    "properties": { "query": { "type": "string" } },
                    "required": ["query"]
                })),
            },
            ToolDescriptor {
                name: "cat__schema__summarize".to_string(),
                description: "Summarize a page".to_string(),
                input_schema: None,
            },
        ])
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        Ok(json!({ "content": [{ "type": "text", "text": format!("{name}: {arguments}") }] }))
    }
}

/// Records the resolved server each connection was made for.
#[derive(Debug, Default)]
struct RecordingConnector {
    seen: Mutex<Vec<ResolvedClient>>,
}

#[async_trait]
impl EndpointConnector for RecordingConnector {
    async fn connect(&self, server: &ResolvedClient) -> anyhow::Result<Box<dyn ToolEndpoint>> {
        self.seen
            .lock()
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .push(server.clone());
        Ok(Box::new(TwoToolEndpoint))
    }
}

fn chain(profiles: ProfileStore) -> ResolverChain {
    ResolverChain::standard(
        Arc::new(profiles),
        CredentialResolver::new(Arc::new(NoDelegate)),
        EnvVarSource::new("MCP_E2E_TEST_", "_TOKEN"),
    )
}

#[tokio::test]
async fn test_end_to_end_discovery() {
    let dir = tempfile::tempdir().expect("tempdir");

    let creds_path = dir.path().join(".databrickscfg");
    std::fs::write(
        &creds_path,
        "[wiki-profile]\nhost = https://host.example.com\ntoken = dapi-static\n",
    )
    .expect("write credentials");

    let servers = json!({
        "wikipedia-search": {
            "type": "streamable-http",
            "url": "https://host.example.com/api/2.0/mcp/vector-search/cat/schema",
            "headers": { "Authorization": "Bearer ${PROFILE_TOKEN}" },
            "profile": "wiki-profile",
            "note": "profile authentication"
        }
    });
    let config_path = dir.path().join("mcp.json");
    let original = serde_json::to_string_pretty(&json!({ "mcpServers": servers }))
        .expect("serialize");
    std::fs::write(&config_path, &original).expect("write registry");

    let profiles = ProfileStore::load(&creds_path).expect("load profiles");
    let connector = Arc::new(RecordingConnector::default());
    let mut registry = ServerRegistry::load(
        &config_path,
        &chain(profiles),
        Arc::clone(&connector) as Arc<dyn EndpointConnector>,
    )
    .await
    .expect("load registry");
    assert_eq!(registry.list_names(), vec!["wikipedia-search"]);

    let catalog = discover_all_tools(&mut registry).await;
    assert_eq!(catalog.len(), 2);
    assert!(catalog.values().all(|t| t.server == "wikipedia-search"));
    assert!(catalog.get("cat__schema__summarize").unwrap().input_schema.is_none());
    assert_eq!(
        catalog.names().collect::<Vec<_>>(),
        vec!["cat__schema__wikipedia", "cat__schema__summarize"]
    );

    let seen = connector.seen.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].token, "dapi-static");
    assert_eq!(seen[0].hostname, "host.example.com");
    assert_eq!(seen[0].origin, TokenOrigin::Profile);
    drop(seen);

    update_mcp_config(&config_path, &catalog).expect("update registry");

    let updated = std::fs::read_to_string(&config_path).expect("read back");
    let doc: serde_json::Value = serde_json::from_str(&updated).expect("valid json");
    assert_eq!(doc["mcpServers"], servers);
    assert_eq!(doc["tools"].as_object().map(serde_json::Map::len), Some(2));
    assert_eq!(
        doc["tools"]["cat__schema__wikipedia"]["server"],
        json!("wikipedia-search")
    );

    // The mcpServers block is rendered exactly as before.
    let servers_block = |text: &str| -> String {
        let start = text.find("\"mcpServers\"").expect("mcpServers key");
        let end = text[start..].find("\n  }").expect("block end") + start;
        text[start..end].to_string()
    };
    assert_eq!(servers_block(&updated), servers_block(&original));
}

#[tokio::test]
async fn test_tool_calls_through_registry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("mcp.json");
    std::fs::write(
        &config_path,
        json!({
            "mcpServers": {
                "docs": {
                    "url": "https://host.example.com/api/2.0/mcp/docs",
                    "headers": { "Authorization": "Bearer literal-token" }
                }
            }
        })
        .to_string(),
    )
    .expect("write registry");

    let mut registry = ServerRegistry::load(
        &config_path,
        &chain(ProfileStore::default()),
        Arc::new(RecordingConnector::default()) as Arc<dyn EndpointConnector>,
    )
    .await
    .expect("load registry");

    let client = registry.get_mut("docs").expect("docs server");
    assert!(matches!(
        client.call_tool("cat__schema__wikipedia", json!({})).await,
        Err(McpCliError::UninitializedClient { .. })
    ));

    client.initialize().await.expect("initialize");
    let info = client.get_tool_info("cat__schema__wikipedia").expect("tool");
    assert_eq!(info.description, "Search Wikipedia chunks");

    let result = client
        .call_tool("cat__schema__wikipedia", json!({ "query": "python" }))
        .await
        .expect("call");
    assert_eq!(
        result["content"][0]["text"],
        json!(r#"cat__schema__wikipedia: {"query":"python"}"#)
    );
}
