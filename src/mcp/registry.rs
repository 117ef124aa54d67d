use crate::auth::{CredentialResolver, ProfileStore, ResolverChain, TokenOrigin};
use crate::error::{McpCliError, Result};
use crate::mcp::client::{EndpointConnector, ToolClient};
use crate::mcp::config::{McpConfig, ServerEntry, load_mcp_config};
use std::{path::Path, sync::Arc};

/// A server whose token resolved, ready to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedClient {
    pub name: String,
    /// Authority component of `url`.
    pub hostname: String,
    pub token: String,
    pub url: String,
    /// Credentials profile mapped in the registry file, if any.
    pub profile: Option<String>,
    pub origin: TokenOrigin,
}

impl std::fmt::Debug for ResolvedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedClient")
            .field("name", &self.name)
            .field("hostname", &self.hostname)
            .field("url", &self.url)
            .field("profile", &self.profile)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Third `/`-delimited segment of `url`: `https://host/a/b` → `host`.
pub fn workspace_hostname(url: &str) -> Option<&str> {
    url.split('/').nth(2).filter(|h| !h.is_empty())
}

/// The usable servers from a registry file, in file order.
///
/// Servers without a resolvable token are left out; loading never fails
/// because of a single server.
#[derive(Debug)]
pub struct ServerRegistry {
    clients: Vec<ToolClient>,
}

impl ServerRegistry {
    /// Load `path` and resolve every server through `chain`.
    ///
    /// Fails only when the file is missing or not valid JSON.
    pub async fn load(
        path: impl AsRef<Path>,
        chain: &ResolverChain,
        connector: Arc<dyn EndpointConnector>,
    ) -> Result<Self> {
        let cfg = load_mcp_config(path)?;
        Ok(Self::from_config(&cfg, chain, connector).await)
    }

    pub async fn from_config(
        cfg: &McpConfig,
        chain: &ResolverChain,
        connector: Arc<dyn EndpointConnector>,
    ) -> Self {
        let mut clients = Vec::with_capacity(cfg.mcp_servers.len());

        for entry in &cfg.mcp_servers {
            let Some(hostname) = workspace_hostname(&entry.url) else {
                tracing::warn!(
                    name: "mcp.registry.bad_url",
                    server = %entry.name,
                    url = %entry.url,
                    "Server URL has no host; skipping"
                );
                continue;
            };
            match Self::resolve_entry(entry, hostname, chain).await {
                Ok(resolved) => clients.push(ToolClient::new(resolved, Arc::clone(&connector))),
                Err(e) => tracing::warn!(
                    name: "mcp.registry.no_token",
                    server = %entry.name,
                    error = %e,
                    "Skipping server"
                ),
            }
        }

        tracing::info!(
            name: "mcp.registry.loaded",
            configured = cfg.mcp_servers.len(),
            usable = clients.len(),
            "Server registry loaded"
        );
        Self { clients }
    }

    async fn resolve_entry(
        entry: &ServerEntry,
        hostname: &str,
        chain: &ResolverChain,
    ) -> Result<ResolvedClient> {
        let credential = chain
            .resolve(entry)
            .await
            .ok_or_else(|| McpCliError::CredentialUnavailable {
                server: entry.name.clone(),
            })?;

        tracing::info!(
            name: "mcp.registry.token_resolved",
            server = %entry.name,
            origin = %credential.origin,
            "Resolved server token"
        );
        Ok(ResolvedClient {
            name: entry.name.clone(),
            hostname: hostname.to_string(),
            token: credential.token,
            url: entry.url.clone(),
            profile: entry.profile.clone(),
            origin: credential.origin,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ToolClient> {
        self.clients.iter().find(|c| c.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ToolClient> {
        self.clients.iter_mut().find(|c| c.name() == name)
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.clients.iter().map(ToolClient::name).collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ToolClient> {
        self.clients.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Profile mapped to `server` in the registry file.
    pub fn server_profile(&self, server: &str) -> Option<&str> {
        self.get(server)?.server().profile.as_deref()
    }

    /// Whether the profile mapped to `server` would authenticate on its own.
    pub async fn validate_server(
        &self,
        server: &str,
        profiles: &ProfileStore,
        resolver: &CredentialResolver,
    ) -> bool {
        let Some(profile) = self.server_profile(server).and_then(|p| profiles.get(p)) else {
            return false;
        };
        resolver.validate(profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolver::PROFILE_TOKEN_PLACEHOLDER;
    use crate::auth::resolver::tests::StaticDelegate;
    use crate::auth::{EnvVarSource, Profile, TokenDelegate};
    use crate::mcp::client::tests::FakeConnector;
    use serde_json::json;

    fn chain(profiles: Vec<Profile>, delegate: StaticDelegate) -> ResolverChain {
        ResolverChain::standard(
            Arc::new(ProfileStore::from_profiles(profiles)),
            CredentialResolver::new(Arc::new(delegate) as Arc<dyn TokenDelegate>),
            EnvVarSource::new("MCP_REGISTRY_TEST_", "_TOKEN"),
        )
    }

    fn connector() -> Arc<dyn EndpointConnector> {
        Arc::new(FakeConnector::default())
    }

    fn config(doc: &serde_json::Value) -> McpConfig {
        McpConfig::from_value(Path::new("mcp.json"), doc).unwrap()
    }

    #[test]
    fn test_workspace_hostname() {
        assert_eq!(
            workspace_hostname("https://host.example.com/api/2.0/mcp/x/y"),
            Some("host.example.com")
        );
        assert_eq!(workspace_hostname("http://h:8080"), Some("h:8080"));
        assert_eq!(workspace_hostname("host-only"), None);
        assert_eq!(workspace_hostname("https:///path"), None);
    }

    #[tokio::test]
    async fn test_placeholder_without_profile_is_skipped() {
        let cfg = config(&json!({
            "mcpServers": {
                "wiki": {
                    "url": "https://host.example.com/api/2.0/mcp/x/y",
                    "headers": { "Authorization": PROFILE_TOKEN_PLACEHOLDER }
                },
                "docs": {
                    "url": "https://host.example.com/api/2.0/mcp/d",
                    "headers": { "Authorization": "Bearer literal" }
                }
            }
        }));
        let registry =
            ServerRegistry::from_config(&cfg, &chain(vec![], StaticDelegate::default()), connector())
                .await;
        assert_eq!(registry.list_names(), vec!["docs"]);
        assert!(registry.get("wiki").is_none());
        assert_eq!(registry.get("docs").unwrap().server().origin, TokenOrigin::ConfigFile);
    }

    #[tokio::test]
    async fn test_profile_mapped_server() {
        let mut profile = Profile::new("wiki-profile");
        profile.host = "https://host.example.com".to_string();
        profile.token = Some("profile-token".to_string());

        let cfg = config(&json!({
            "mcpServers": {
                "wiki": {
                    "url": "https://host.example.com/api/2.0/mcp/x/y",
                    "headers": { "Authorization": PROFILE_TOKEN_PLACEHOLDER },
                    "profile": "wiki-profile"
                }
            }
        }));
        let registry = ServerRegistry::from_config(
            &cfg,
            &chain(vec![profile.clone()], StaticDelegate::default()),
            connector(),
        )
        .await;

        let client = registry.get("wiki").unwrap();
        assert_eq!(client.server().hostname, "host.example.com");
        assert_eq!(client.server().token, "profile-token");
        assert_eq!(client.server().origin, TokenOrigin::Profile);
        assert_eq!(registry.server_profile("wiki"), Some("wiki-profile"));

        let profiles = ProfileStore::from_profiles(vec![profile]);
        let resolver =
            CredentialResolver::new(Arc::new(StaticDelegate::default()) as Arc<dyn TokenDelegate>);
        assert!(registry.validate_server("wiki", &profiles, &resolver).await);
        assert!(!registry.validate_server("missing", &profiles, &resolver).await);
    }

    #[tokio::test]
    async fn test_delegated_profile_token() {
        let mut profile = Profile::new("cli-profile");
        profile.auth_type = Some("databricks-cli".to_string());

        let cfg = config(&json!({
            "mcpServers": {
                "wiki": {
                    "url": "https://host.example.com/api/2.0/mcp/x/y",
                    "headers": { "Authorization": PROFILE_TOKEN_PLACEHOLDER },
                    "profile": "cli-profile"
                }
            }
        }));
        let registry = ServerRegistry::from_config(
            &cfg,
            &chain(vec![profile], StaticDelegate::with("cli-profile", "oauth")),
            connector(),
        )
        .await;
        assert_eq!(registry.get("wiki").unwrap().server().token, "oauth");
    }

    #[tokio::test]
    async fn test_unresolvable_servers_dropped() {
        let cfg = config(&json!({
            "mcpServers": {
                "no-header": { "url": "https://h/a" },
                "bad-url": { "url": "nowhere", "headers": { "Authorization": "Bearer x" } },
                "basic": { "url": "https://h/b", "headers": { "Authorization": "Basic x" } }
            }
        }));
        let registry =
            ServerRegistry::from_config(&cfg, &chain(vec![], StaticDelegate::default()), connector())
                .await;
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_missing_token_is_credential_unavailable() {
        let entry = ServerEntry::new("wiki", "https://h/a")
            .with_authorization(PROFILE_TOKEN_PLACEHOLDER)
            .with_profile(Some("absent"));
        let err = ServerRegistry::resolve_entry(&entry, "h", &chain(vec![], StaticDelegate::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            McpCliError::CredentialUnavailable { ref server } if server == "wiki"
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ServerRegistry::load(
            dir.path().join("mcp.json"),
            &chain(vec![], StaticDelegate::default()),
            connector(),
        )
        .await;
        assert!(matches!(
            result,
            Err(McpCliError::ConfigurationMissing { .. })
        ));
    }
}
