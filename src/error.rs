//! Error taxonomy for credential resolution, the server registry and tool calls.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the library.
///
/// Multi-server operations treat most of these as per-server outcomes: a
/// server that fails is reported and skipped, the rest keep going.
#[derive(Error, Debug)]
pub enum McpCliError {
    /// A required configuration file does not exist.
    #[error("configuration file not found: {}", path.display())]
    ConfigurationMissing {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A configuration file exists but could not be read or parsed.
    #[error("malformed configuration file {}: {reason}", path.display())]
    ConfigurationMalformed {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser or I/O message.
        reason: String,
    },

    /// No token source produced a credential for the server.
    #[error("no authentication token available for server '{server}'")]
    CredentialUnavailable {
        /// Server name from the registry file.
        server: String,
    },

    /// A delegated CLI command did not finish in time.
    #[error("CLI command for profile '{profile}' timed out after {timeout:?}")]
    DelegationTimeout {
        /// Profile passed to the command.
        profile: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// A delegated CLI command failed or printed something unusable.
    #[error("CLI command for profile '{profile}' failed: {reason}")]
    DelegationFailure {
        /// Profile passed to the command.
        profile: String,
        /// What went wrong.
        reason: String,
    },

    /// A catalog operation was attempted before `initialize`.
    #[error("client for server '{server}' is not initialized; call initialize() first")]
    UninitializedClient {
        /// Server name.
        server: String,
    },

    /// The server's catalog has no tool with that name.
    #[error("tool '{tool}' not found on server '{server}'")]
    ToolNotFound {
        /// Server name.
        server: String,
        /// Requested tool.
        tool: String,
    },

    /// The remote endpoint rejected or failed a tool call.
    #[error("tool '{tool}' on server '{server}' failed: {reason}")]
    ToolInvocationFailure {
        /// Server name.
        server: String,
        /// Tool that was called.
        tool: String,
        /// Message from the endpoint or transport.
        reason: String,
    },

    /// The server is not in the usable set.
    #[error("server '{server}' not found")]
    ServerNotFound {
        /// Requested server name.
        server: String,
    },

    /// Connecting to or listing tools on a server failed.
    #[error("connection to server '{server}' failed: {reason}")]
    Connection {
        /// Server name.
        server: String,
        /// Transport message.
        reason: String,
    },

    /// Caller-supplied tool parameters are not a JSON object.
    #[error("invalid tool parameters: {0}")]
    InvalidParameters(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, McpCliError>;
