//! Model Context Protocol (MCP) client side.
//!
//! Servers are configured in the registry file (`.cursor/mcp.json` by
//! default):
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "wikipedia-search": {
//!       "type": "streamable-http",
//!       "url": "https://example.cloud.databricks.com/api/2.0/mcp/vector-search/cat/schema",
//!       "headers": { "Authorization": "Bearer ${PROFILE_TOKEN}" },
//!       "profile": "wikipedia-search"
//!     }
//!   },
//!   "tools": {
//!     "cat__schema__wikipedia": {
//!       "description": "...",
//!       "input_schema": { "type": "object" },
//!       "server": "wikipedia-search"
//!     }
//!   }
//! }
//! ```
//!
//! The `tools` section is written by [`discovery`]; [`vector_search`] drafts
//! `mcpServers` entries from the workspace's vector-search indexes.

pub mod client;
pub mod config;
pub mod discovery;
pub mod registry;
pub mod transport;
pub mod vector_search;

pub use client::{EndpointConnector, ToolClient, ToolDescriptor, ToolEndpoint};
pub use discovery::{DiscoveredTool, ToolCatalog};
pub use registry::{ResolvedClient, ServerRegistry};
