//! Credentials file parsing.
//!
//! The file is INI-like:
//!
//! ```text
//! [wikipedia-search]
//! host = https://example.cloud.databricks.com
//! token = dapi...
//!
//! [DEFAULT]
//! host = https://example.cloud.databricks.com
//! auth_type = databricks-cli
//! ```

use crate::error::{McpCliError, Result};
use std::path::Path;

/// `auth_type` value that marks a profile whose token comes from the CLI.
pub const DELEGATED_AUTH_TYPE: &str = "databricks-cli";

/// A named credentials entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// Workspace URL or bare hostname; empty when the file omits it.
    pub host: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_type: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// True when `auth_type` asks for the delegated token command.
    pub fn uses_delegated_auth(&self) -> bool {
        self.auth_type.as_deref() == Some(DELEGATED_AUTH_TYPE)
    }

    pub fn has_static_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_basic_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Base URL of the workspace: `host` as written when it carries a
    /// scheme, otherwise `https://<host>`.
    pub fn workspace_url(&self) -> Option<String> {
        let host = self.host.trim_end_matches('/');
        if host.is_empty() {
            None
        } else if host.contains("://") {
            Some(host.to_string())
        } else {
            Some(format!("https://{host}"))
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        let value = value.to_string();
        match key {
            "host" => self.host = value,
            "token" => self.token = Some(value),
            "username" => self.username = Some(value),
            "password" => self.password = Some(value),
            "auth_type" => self.auth_type = Some(value),
            _ => {}
        }
    }
}

/// All profiles from one credentials file, in file order.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: Vec<Profile>,
    default_name: String,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            default_name: crate::config::DEFAULT_PROFILE.to_string(),
        }
    }
}

impl ProfileStore {
    /// Load profiles from `path`.
    ///
    /// A missing file yields an empty store: callers may rely solely on
    /// environment variables or literal tokens.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    name: "auth.profiles.missing",
                    path = %path.display(),
                    "Credentials file not found"
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(McpCliError::ConfigurationMalformed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let store = Self::parse(&text);
        tracing::debug!(
            name: "auth.profiles.loaded",
            path = %path.display(),
            count = store.len(),
            "Loaded credential profiles"
        );
        Ok(store)
    }

    /// Parse credentials file content.
    pub fn parse(text: &str) -> Self {
        let mut profiles: Vec<Profile> = Vec::new();
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                // A repeated header starts the profile over.
                current = Some(match profiles.iter().position(|p| p.name == name) {
                    Some(idx) => {
                        profiles[idx] = Profile::new(name);
                        idx
                    }
                    None => {
                        profiles.push(Profile::new(name));
                        profiles.len() - 1
                    }
                });
                continue;
            }

            let (Some(idx), Some((key, value))) = (current, line.split_once('=')) else {
                continue;
            };
            let profile = &mut profiles[idx];
            profile.set(key.trim(), value.trim());

            if profile.uses_delegated_auth() && key.trim() == "auth_type" {
                tracing::debug!(
                    name: "auth.profile.delegated",
                    profile = %profile.name,
                    "Profile uses delegated CLI authentication"
                );
            }
        }

        Self {
            profiles,
            ..Self::default()
        }
    }

    pub fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles,
            ..Self::default()
        }
    }

    /// Name used by [`ProfileStore::get_default`].
    #[must_use]
    pub fn with_default_profile(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn get_default(&self) -> Option<&Profile> {
        self.get(&self.default_name)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
[wikipedia-search]
host = https://e2-demo.cloud.databricks.com
token = dapi-one

[doc-search]
host=https://e2-demo.cloud.databricks.com
auth_type = databricks-cli
cluster_id = 0123

[DEFAULT]
host = https://default.cloud.databricks.com
username = alice
password = hunter2
";

    #[test]
    fn test_one_profile_per_section() {
        let store = ProfileStore::parse(SAMPLE);
        assert_eq!(store.len(), 3);
        assert_eq!(store.names(), vec!["wikipedia-search", "doc-search", "DEFAULT"]);
    }

    #[test]
    fn test_fields_parsed() {
        let store = ProfileStore::parse(SAMPLE);
        let wiki = store.get("wikipedia-search").unwrap();
        assert_eq!(wiki.host, "https://e2-demo.cloud.databricks.com");
        assert_eq!(wiki.token.as_deref(), Some("dapi-one"));
        assert!(wiki.has_static_token());

        let doc = store.get("doc-search").unwrap();
        assert!(doc.token.is_none());
        assert!(doc.uses_delegated_auth());

        let default = store.get("DEFAULT").unwrap();
        assert!(default.has_basic_credentials());
        assert!(!default.has_static_token());
    }

    #[test]
    fn test_last_key_wins() {
        let store = ProfileStore::parse("[p]\ntoken = first\ntoken = second\n");
        assert_eq!(store.get("p").unwrap().token.as_deref(), Some("second"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let store = ProfileStore::parse("[p]\ntoken = abc==\n");
        assert_eq!(store.get("p").unwrap().token.as_deref(), Some("abc=="));
    }

    #[test]
    fn test_malformed_and_orphan_lines_skipped() {
        let store = ProfileStore::parse("token = orphan\n[p]\nnot a pair\n# host = commented\nhost = h\n");
        assert_eq!(store.len(), 1);
        let p = store.get("p").unwrap();
        assert_eq!(p.host, "h");
        assert!(p.token.is_none());
    }

    #[test]
    fn test_repeated_section_starts_over() {
        let store = ProfileStore::parse("[p]\ntoken = a\n[q]\n[p]\nhost = h\n");
        assert_eq!(store.len(), 2);
        let p = store.get("p").unwrap();
        assert!(p.token.is_none());
        assert_eq!(p.host, "h");
    }

    #[test]
    fn test_workspace_url() {
        let mut p = Profile::new("p");
        assert_eq!(p.workspace_url(), None);
        p.host = "example.cloud.databricks.com".to_string();
        assert_eq!(p.workspace_url().as_deref(), Some("https://example.cloud.databricks.com"));
        p.host = "https://example.cloud.databricks.com/".to_string();
        assert_eq!(p.workspace_url().as_deref(), Some("https://example.cloud.databricks.com"));
        p.host = "http://127.0.0.1:8080".to_string();
        assert_eq!(p.workspace_url().as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_default_profile_lookup() {
        let store = ProfileStore::parse(SAMPLE);
        assert_eq!(store.default_name(), "DEFAULT");
        assert_eq!(store.get_default().unwrap().name, "DEFAULT");

        let store = store.with_default_profile("doc-search");
        assert_eq!(store.get_default().unwrap().name, "doc-search");

        let store = store.with_default_profile("missing");
        assert!(store.get_default().is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::load(dir.path().join("nope.cfg")).unwrap();
        assert!(store.is_empty());
        assert!(store.get("DEFAULT").is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".databrickscfg");
        std::fs::write(&path, SAMPLE).unwrap();
        let store = ProfileStore::load(&path).unwrap();
        assert_eq!(store.len(), 3);
    }
}
