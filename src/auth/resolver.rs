//! Token resolution.
//!
//! A server's bearer token comes from the first [`TokenSource`] in a
//! [`ResolverChain`] that produces one. The default chain is:
//!
//! 1. the server's mapped credentials profile ([`ProfileSource`])
//! 2. a per-server environment variable ([`EnvVarSource`])
//! 3. a literal `Bearer` token in the registry file ([`ConfigLiteralSource`])

use crate::auth::delegate::TokenDelegate;
use crate::auth::profile::{Profile, ProfileStore};
use crate::mcp::config::ServerEntry;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Authorization header value meaning "fill this in from the mapped profile".
pub const PROFILE_TOKEN_PLACEHOLDER: &str = "Bearer ${PROFILE_TOKEN}";

/// Workspace endpoint used by [`CredentialResolver::test_connection`].
pub const CONNECTION_CHECK_PATH: &str = "/api/2.0/clusters/list";
const CONNECTION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    Profile,
    Environment,
    ConfigFile,
}

impl std::fmt::Display for TokenOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Profile => "profile",
            Self::Environment => "environment",
            Self::ConfigFile => "config file",
        })
    }
}

/// A bearer token plus its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub origin: TokenOrigin,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("origin", &self.origin)
            .finish()
    }
}

/// Profile-level token operations: static token first, then delegation.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    delegate: Arc<dyn TokenDelegate>,
}

impl CredentialResolver {
    pub fn new(delegate: Arc<dyn TokenDelegate>) -> Self {
        Self { delegate }
    }

    /// Bearer token for `profile`, or `None` when nothing works.
    pub async fn token_for(&self, profile: &Profile) -> Option<String> {
        if profile.has_static_token() {
            return profile.token.clone();
        }
        self.delegated_token(&profile.name).await
    }

    async fn delegated_token(&self, profile: &str) -> Option<String> {
        match self.delegate.fetch_token(profile).await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(
                    name: "auth.delegate.failed",
                    profile = %profile,
                    error = %e,
                    "Delegated token fetch failed"
                );
                None
            }
        }
    }

    /// Host with one leading `https://` or `http://` removed.
    pub fn hostname_for(profile: &Profile) -> Option<String> {
        if profile.host.is_empty() {
            return None;
        }
        let host = profile.host.as_str();
        let bare = host
            .strip_prefix("https://")
            .or_else(|| host.strip_prefix("http://"))
            .unwrap_or(host);
        Some(bare.to_string())
    }

    /// Whether `profile` would actually authenticate.
    pub async fn validate(&self, profile: &Profile) -> bool {
        if profile.has_static_token() {
            return true;
        }
        if profile.has_basic_credentials() {
            if profile.host.is_empty() {
                tracing::warn!(
                    name: "auth.profile.invalid",
                    profile = %profile.name,
                    "Profile missing host configuration"
                );
                return false;
            }
            return true;
        }
        let ok = self.delegated_token(&profile.name).await.is_some();
        if !ok {
            tracing::warn!(
                name: "auth.profile.invalid",
                profile = %profile.name,
                "Profile missing authentication credentials"
            );
        }
        ok
    }

    /// `GET <workspace>/api/2.0/clusters/list` with the profile's token;
    /// true only on `200 OK`.
    pub async fn test_connection(&self, http: &reqwest::Client, profile: &Profile) -> bool {
        let Some(base) = profile.workspace_url() else {
            tracing::warn!(name: "auth.connection.no_host", profile = %profile.name, "Profile has no host");
            return false;
        };
        let Some(token) = self.token_for(profile).await else {
            return false;
        };

        let url = format!("{base}{CONNECTION_CHECK_PATH}");
        match http
            .get(&url)
            .bearer_auth(token)
            .timeout(CONNECTION_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => {
                let ok = resp.status() == reqwest::StatusCode::OK;
                tracing::info!(
                    name: "auth.connection.checked",
                    profile = %profile.name,
                    status = %resp.status(),
                    "Workspace connection checked"
                );
                ok
            }
            Err(e) => {
                tracing::warn!(
                    name: "auth.connection.failed",
                    profile = %profile.name,
                    url = %url,
                    error = %e,
                    "Workspace connection test failed"
                );
                false
            }
        }
    }
}

/// One strategy for producing a server's token.
#[async_trait]
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    fn origin(&self) -> TokenOrigin;

    /// Token for `server`, or `None` to let the next source try.
    async fn resolve(&self, server: &ServerEntry) -> Option<String>;
}

/// Tokens from the credentials profile named by the server entry.
#[derive(Debug, Clone)]
pub struct ProfileSource {
    profiles: Arc<ProfileStore>,
    resolver: CredentialResolver,
}

impl ProfileSource {
    pub fn new(profiles: Arc<ProfileStore>, resolver: CredentialResolver) -> Self {
        Self { profiles, resolver }
    }
}

#[async_trait]
impl TokenSource for ProfileSource {
    fn origin(&self) -> TokenOrigin {
        TokenOrigin::Profile
    }

    async fn resolve(&self, server: &ServerEntry) -> Option<String> {
        let name = server.profile.as_deref()?;
        let Some(profile) = self.profiles.get(name) else {
            tracing::warn!(
                name: "auth.profile.not_found",
                server = %server.name,
                profile = %name,
                "Mapped profile not found in credentials file"
            );
            return None;
        };
        self.resolver.token_for(profile).await
    }
}

/// Tokens from `<prefix><SERVER_NAME><suffix>` environment variables.
#[derive(Debug, Clone)]
pub struct EnvVarSource {
    prefix: String,
    suffix: String,
}

impl EnvVarSource {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// `wikipedia-search` becomes `MCP_WIKIPEDIA_SEARCH_TOKEN` with the default affixes.
    pub fn variable_name(&self, server: &str) -> String {
        format!(
            "{}{}{}",
            self.prefix,
            server.to_uppercase().replace('-', "_"),
            self.suffix
        )
    }
}

impl Default for EnvVarSource {
    fn default() -> Self {
        Self::new("MCP_", "_TOKEN")
    }
}

#[async_trait]
impl TokenSource for EnvVarSource {
    fn origin(&self) -> TokenOrigin {
        TokenOrigin::Environment
    }

    async fn resolve(&self, server: &ServerEntry) -> Option<String> {
        let var = self.variable_name(&server.name);
        let token = std::env::var(&var).ok().filter(|t| !t.trim().is_empty())?;
        tracing::debug!(name: "auth.env.found", server = %server.name, variable = %var, "Token found in environment");
        Some(token)
    }
}

/// Literal `Bearer <token>` values from the registry file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLiteralSource;

#[async_trait]
impl TokenSource for ConfigLiteralSource {
    fn origin(&self) -> TokenOrigin {
        TokenOrigin::ConfigFile
    }

    async fn resolve(&self, server: &ServerEntry) -> Option<String> {
        let header = server.authorization()?.trim();
        if header == PROFILE_TOKEN_PLACEHOLDER {
            tracing::warn!(
                name: "auth.placeholder.unresolved",
                server = %server.name,
                "Profile token placeholder found but no profile produced a token"
            );
            return None;
        }
        let token = header.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }
        if token.starts_with("${") && token.ends_with('}') {
            tracing::warn!(
                name: "auth.placeholder.unresolved",
                server = %server.name,
                placeholder = %token,
                "Unexpanded placeholder in Authorization header"
            );
            return None;
        }
        Some(token.to_string())
    }
}

/// Ordered token sources; the first one that yields a token wins.
#[derive(Debug, Default)]
pub struct ResolverChain {
    sources: Vec<Box<dyn TokenSource>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Profile → environment → config literal.
    pub fn standard(
        profiles: Arc<ProfileStore>,
        resolver: CredentialResolver,
        env: EnvVarSource,
    ) -> Self {
        Self::new()
            .with_source(ProfileSource::new(profiles, resolver))
            .with_source(env)
            .with_source(ConfigLiteralSource)
    }

    pub async fn resolve(&self, server: &ServerEntry) -> Option<Credential> {
        for source in &self.sources {
            if let Some(token) = source.resolve(server).await {
                return Some(Credential {
                    token,
                    origin: source.origin(),
                });
            }
        }
        None
    }
}
