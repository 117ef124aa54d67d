use crate::error::{McpCliError, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// One entry under `mcpServers`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerEntry {
    /// Key under `mcpServers`; not part of the entry body.
    #[serde(skip)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Credentials profile that supplies this server's token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Keys such as `type` or `note` that are carried but not interpreted.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ServerEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            profile: None,
            extra: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.headers.insert("Authorization".to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Option<&str>) -> Self {
        self.profile = profile.map(str::to_string);
        self
    }

    /// The declared `Authorization` header, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("Authorization").map(String::as_str)
    }
}

/// Parsed registry file. Servers keep the file's order.
#[derive(Debug, Clone, Default)]
pub struct McpConfig {
    pub mcp_servers: Vec<ServerEntry>,
}

impl McpConfig {
    /// Parse registry file content. Individual server entries that do not
    /// match the expected shape are skipped with a warning.
    pub fn from_value(path: &Path, doc: &serde_json::Value) -> Result<Self> {
        let root = doc
            .as_object()
            .ok_or_else(|| McpCliError::ConfigurationMalformed {
                path: path.to_path_buf(),
                reason: "top-level value is not an object".to_string(),
            })?;

        let Some(servers) = root.get("mcpServers") else {
            return Ok(Self::default());
        };
        let servers = servers
            .as_object()
            .ok_or_else(|| McpCliError::ConfigurationMalformed {
                path: path.to_path_buf(),
                reason: "mcpServers is not an object".to_string(),
            })?;

        let mut mcp_servers = Vec::with_capacity(servers.len());
        for (name, body) in servers {
            match serde_json::from_value::<ServerEntry>(body.clone()) {
                Ok(mut entry) => {
                    entry.name.clone_from(name);
                    mcp_servers.push(entry);
                }
                Err(e) => tracing::warn!(
                    name: "mcp.config.entry_invalid",
                    server = %name,
                    error = %e,
                    "Skipping malformed server entry"
                ),
            }
        }
        Ok(Self { mcp_servers })
    }

    pub fn server(&self, name: &str) -> Option<&ServerEntry> {
        self.mcp_servers.iter().find(|s| s.name == name)
    }
}

/// Read a JSON document, mapping absence and parse failures to the
/// configuration error variants.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let txt = match fs::read_to_string(path) {
        Ok(txt) => txt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(McpCliError::ConfigurationMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&txt).map_err(|e| McpCliError::ConfigurationMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn load_mcp_config(path: impl AsRef<Path>) -> Result<McpConfig> {
    let path = path.as_ref();
    let doc = read_json(path)?;
    McpConfig::from_value(path, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_servers_in_order() {
        let doc = json!({
            "mcpServers": {
                "wikipedia-search": {
                    "type": "streamable-http",
                    "url": "https://e2.example.com/api/2.0/mcp/vector-search/a/b",
                    "headers": { "Authorization": "Bearer ${PROFILE_TOKEN}" },
                    "profile": "wikipedia-search"
                },
                "doc-search": {
                    "url": "https://e2.example.com/api/2.0/mcp/vector-search/c/d",
                    "headers": { "Authorization": "Bearer abc" }
                }
            }
        });
        let cfg = McpConfig::from_value(Path::new("mcp.json"), &doc).unwrap();
        let names: Vec<_> = cfg.mcp_servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["wikipedia-search", "doc-search"]);

        let wiki = cfg.server("wikipedia-search").unwrap();
        assert_eq!(wiki.profile.as_deref(), Some("wikipedia-search"));
        assert_eq!(wiki.authorization(), Some("Bearer ${PROFILE_TOKEN}"));
        assert_eq!(wiki.extra.get("type"), Some(&json!("streamable-http")));

        let doc_search = cfg.server("doc-search").unwrap();
        assert!(doc_search.profile.is_none());
    }

    #[test]
    fn test_invalid_entry_skipped() {
        let doc = json!({
            "mcpServers": {
                "broken": { "headers": {} },
                "ok": { "url": "https://h/x" }
            }
        });
        let cfg = McpConfig::from_value(Path::new("mcp.json"), &doc).unwrap();
        assert_eq!(cfg.mcp_servers.len(), 1);
        assert_eq!(cfg.mcp_servers[0].name, "ok");
        assert!(cfg.mcp_servers[0].authorization().is_none());
    }

    #[test]
    fn test_missing_servers_key() {
        let cfg = McpConfig::from_value(Path::new("mcp.json"), &json!({"tools": {}})).unwrap();
        assert!(cfg.mcp_servers.is_empty());
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_mcp_config(&missing),
            Err(McpCliError::ConfigurationMissing { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            load_mcp_config(&bad),
            Err(McpCliError::ConfigurationMalformed { .. })
        ));

        let array = dir.path().join("array.json");
        std::fs::write(&array, "[]").unwrap();
        assert!(matches!(
            load_mcp_config(&array),
            Err(McpCliError::ConfigurationMalformed { .. })
        ));
    }
}
