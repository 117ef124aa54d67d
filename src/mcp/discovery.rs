//! Tool discovery across every registered server, and persistence of the
//! result into the registry file's `tools` section.

use crate::error::{McpCliError, Result};
use crate::mcp::config::read_json;
use crate::mcp::registry::ServerRegistry;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// A tool entry as stored under `tools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredTool {
    pub description: String,
    pub input_schema: Option<serde_json::Value>,
    /// Server the tool was last discovered on.
    pub server: String,
}

/// Tools keyed by name, in the order they were first discovered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    entries: Vec<(String, DiscoveredTool)>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tool`, returning the entry it replaced. A replaced tool keeps its
    /// original position.
    pub fn insert(&mut self, name: String, tool: DiscoveredTool) -> Option<DiscoveredTool> {
        if let Some((_, slot)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            return Some(std::mem::replace(slot, tool));
        }
        self.entries.push((name, tool));
        None
    }

    pub fn get(&self, name: &str) -> Option<&DiscoveredTool> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DiscoveredTool)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &DiscoveredTool> {
        self.entries.iter().map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, DiscoveredTool)> for ToolCatalog {
    fn from_iter<I: IntoIterator<Item = (String, DiscoveredTool)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (name, tool) in iter {
            catalog.insert(name, tool);
        }
        catalog
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub succeeded: Vec<String>,
    /// `(server, error message)`
    pub failed: Vec<(String, String)>,
}

impl DiscoverySummary {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Initialize every client in registry order and merge their catalogs.
///
/// A server that fails is recorded in the summary and skipped. When two
/// servers expose the same tool name the later server's entry replaces the
/// earlier one.
pub async fn discover_tools(registry: &mut ServerRegistry) -> (ToolCatalog, DiscoverySummary) {
    let mut catalog = ToolCatalog::new();
    let mut summary = DiscoverySummary::default();

    for client in registry.iter_mut() {
        let server = client.name().to_string();
        tracing::info!(name: "mcp.discovery.server", server = %server, "Discovering tools");

        if let Err(e) = client.initialize().await {
            tracing::warn!(
                name: "mcp.discovery.server_failed",
                server = %server,
                error = %e,
                "Skipping server"
            );
            summary.failed.push((server, e.to_string()));
            continue;
        }

        let tools = match client.list_tools() {
            Ok(tools) => tools,
            Err(e) => {
                summary.failed.push((server, e.to_string()));
                continue;
            }
        };

        for tool in tools {
            let entry = DiscoveredTool {
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
                server: server.clone(),
            };
            if let Some(previous) = catalog.insert(tool.name.clone(), entry) {
                tracing::debug!(
                    name: "mcp.discovery.overwrite",
                    tool = %tool.name,
                    previous_server = %previous.server,
                    server = %server,
                    "Tool name collision; later server wins"
                );
            }
            tracing::info!(name: "mcp.tool.discovered", server = %server, tool = %tool.name, "MCP tool discovered");
        }
        summary.succeeded.push(server);
    }

    tracing::info!(
        name: "mcp.discovery.finished",
        tools = catalog.len(),
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Discovery finished"
    );
    (catalog, summary)
}

pub async fn discover_all_tools(registry: &mut ServerRegistry) -> ToolCatalog {
    discover_tools(registry).await.0
}

/// Merge `tools` into the `tools` object of the registry file at `path`.
///
/// Every other top-level key is written back unchanged and in its original
/// order. The file is replaced via a sibling temporary file.
pub fn update_mcp_config(path: impl AsRef<Path>, tools: &ToolCatalog) -> Result<()> {
    let path = path.as_ref();
    let mut doc = read_json(path)?;
    let root = doc
        .as_object_mut()
        .ok_or_else(|| McpCliError::ConfigurationMalformed {
            path: path.to_path_buf(),
            reason: "top-level value is not an object".to_string(),
        })?;

    let section = root
        .entry("tools")
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()))
        .as_object_mut()
        .ok_or_else(|| McpCliError::ConfigurationMalformed {
            path: path.to_path_buf(),
            reason: "tools is not an object".to_string(),
        })?;

    for (name, tool) in tools.iter() {
        section.insert(name.to_string(), serde_json::to_value(tool)?);
    }

    let mut out = serde_json::to_string_pretty(&doc)?;
    out.push('\n');
    write_replacing(path, &out)?;

    tracing::info!(
        name: "mcp.config.updated",
        path = %path.display(),
        tools = tools.len(),
        "Registry file updated"
    );
    Ok(())
}

/// Write `contents` to `<path>.tmp` and rename it over `path`. The temporary
/// file is removed when either step fails.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let tmp = sibling_path(path, ".tmp");
    let written = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            tracing::debug!(name: "mcp.config.tmp_cleanup", path = %tmp.display(), error = %cleanup, "Temporary file not removed");
        }
        return Err(e.into());
    }
    Ok(())
}

/// `<path>.backup`
pub fn backup_path_for(path: &Path) -> PathBuf {
    sibling_path(path, ".backup")
}

/// Copy the registry file to `<path>.backup`, returning the backup path.
pub fn backup_config(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(McpCliError::ConfigurationMissing {
            path: path.to_path_buf(),
        });
    }
    let backup = backup_path_for(path);
    fs::copy(path, &backup)?;
    tracing::info!(name: "mcp.config.backup", backup = %backup.display(), "Created backup");
    Ok(backup)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
