//! Finding vector-search indexes through the workspace CLI and turning them
//! into registry entries.
//!
//! The walk is catalogs, then schemas per catalog, then indexes per schema.
//! A listing that fails is logged and treated as empty so one inaccessible
//! catalog does not hide the rest.

use crate::auth::CliDelegate;
use crate::auth::resolver::PROFILE_TOKEN_PLACEHOLDER;
use crate::error::Result;
use serde_json::{Map, Value, json};
use std::{fs, path::Path};

/// Where `find-vector-urls` writes its result unless told otherwise.
pub const DEFAULT_FOUND_URLS: &str = ".cursor/mcp-found-urls.json";

/// A vector-search index and the schema that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorIndex {
    pub catalog: String,
    pub schema: String,
    pub name: String,
}

async fn list(cli: &CliDelegate, profile: &str, args: &[&str], key: &str) -> Vec<Value> {
    match cli.run_json(args, profile).await {
        Ok(mut value) => match value.get_mut(key).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Err(e) => {
            tracing::warn!(
                name: "mcp.vector_search.list_failed",
                command = %args.join(" "),
                error = %e,
                "Listing failed"
            );
            Vec::new()
        }
    }
}

fn names(items: &[Value]) -> impl Iterator<Item = &str> {
    items.iter().filter_map(|item| item.get("name").and_then(Value::as_str))
}

/// Every vector-search index visible to `profile`, in listing order.
pub async fn find_vector_indexes(cli: &CliDelegate, profile: &str) -> Vec<VectorIndex> {
    let catalogs = list(cli, profile, &["unity-catalog", "catalogs", "list"], "catalogs").await;
    let mut found = Vec::new();

    for catalog in names(&catalogs) {
        let schemas = list(
            cli,
            profile,
            &["unity-catalog", "schemas", "list", "--catalog-name", catalog],
            "schemas",
        )
        .await;

        for schema in names(&schemas) {
            let indexes = list(
                cli,
                profile,
                &[
                    "ml",
                    "vector-search",
                    "indexes",
                    "list",
                    "--catalog-name",
                    catalog,
                    "--schema-name",
                    schema,
                ],
                "indexes",
            )
            .await;

            for index in &indexes {
                let field = |key: &str, fallback: &str| {
                    index.get(key).and_then(Value::as_str).unwrap_or(fallback).to_string()
                };
                found.push(VectorIndex {
                    catalog: field("catalog_name", catalog),
                    schema: field("schema_name", schema),
                    name: field("name", "unknown"),
                });
            }
            tracing::debug!(
                name: "mcp.vector_search.schema",
                catalog = %catalog,
                schema = %schema,
                indexes = indexes.len(),
                "Schema scanned"
            );
        }
    }
    found
}

/// Server name for a schema: `<catalog>_<schema>`, lowercased, `-` → `_`.
pub fn server_name(catalog: &str, schema: &str) -> String {
    format!("{catalog}_{schema}").replace('-', "_").to_lowercase()
}

/// A registry document with one streamable-HTTP server per schema that holds
/// at least one index. Servers use the profile placeholder header.
pub fn registry_for_indexes(workspace_url: &str, profile: &str, indexes: &[VectorIndex]) -> Value {
    let mut servers = Map::new();
    for index in indexes {
        let VectorIndex { catalog, schema, .. } = index;
        servers.insert(
            server_name(catalog, schema),
            json!({
                "type": "streamable-http",
                "url": format!("{workspace_url}/api/2.0/mcp/vector-search/{catalog}/{schema}"),
                "headers": { "Authorization": PROFILE_TOKEN_PLACEHOLDER },
                "profile": profile,
                "note": format!("Vector search server for {catalog}.{schema}"),
            }),
        );
    }
    json!({ "mcpServers": servers })
}

/// Write `doc` as pretty JSON to `path`, creating parent directories.
pub fn write_registry(path: &Path, doc: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = serde_json::to_string_pretty(doc)?;
    out.push('\n');
    fs::write(path, out)?;
    tracing::info!(name: "mcp.vector_search.saved", path = %path.display(), "Found servers saved");
    Ok(())
}
