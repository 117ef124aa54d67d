//! Delegated token fetch through an already-authenticated companion CLI.

use crate::error::{McpCliError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::{process::Stdio, time::Duration};
use tokio::process::Command;

/// Source of tokens for a profile name, outside the credentials file.
#[async_trait]
pub trait TokenDelegate: Send + Sync + std::fmt::Debug {
    /// Fetch a bearer token for `profile`.
    async fn fetch_token(&self, profile: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Runs `<program> [args..] auth token --profile <name> --output JSON`.
///
/// Other subcommands of the same CLI go through [`CliDelegate::run_json`].
#[derive(Debug, Clone)]
pub struct CliDelegate {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl CliDelegate {
    /// Build from an argv prefix such as `["databricks"]`.
    ///
    /// Returns `None` when `command` is empty.
    pub fn new(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, leading_args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            leading_args: leading_args.to_vec(),
            timeout,
        })
    }

    pub fn from_config(auth: &crate::config::AuthConfig) -> Option<Self> {
        Self::new(&auth.cli_command, Duration::from_secs(auth.timeout_secs))
    }

    fn command(&self, args: &[&str], profile: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .args(["--profile", profile, "--output", "JSON"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `<program> [args..] <args> --profile <profile> --output JSON` and
    /// parse stdout as JSON.
    pub async fn run_json(&self, args: &[&str], profile: &str) -> Result<serde_json::Value> {
        let output = tokio::time::timeout(self.timeout, self.command(args, profile).output())
            .await
            .map_err(|_| McpCliError::DelegationTimeout {
                profile: profile.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| McpCliError::DelegationFailure {
                profile: profile.to_string(),
                reason: format!("failed to run '{}': {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(McpCliError::DelegationFailure {
                profile: profile.to_string(),
                reason: format!("'{}' {}: {}", args.join(" "), output.status, stderr.trim()),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| McpCliError::DelegationFailure {
            profile: profile.to_string(),
            reason: format!("invalid JSON output from '{}': {e}", args.join(" ")),
        })
    }
}

#[async_trait]
impl TokenDelegate for CliDelegate {
    async fn fetch_token(&self, profile: &str) -> Result<String> {
        let output = self.run_json(&["auth", "token"], profile).await?;
        access_token(output).map_err(|reason| McpCliError::DelegationFailure {
            profile: profile.to_string(),
            reason,
        })
    }
}

fn access_token(output: serde_json::Value) -> std::result::Result<String, String> {
    let parsed: TokenResponse =
        serde_json::from_value(output).map_err(|e| format!("unexpected token output: {e}"))?;
    parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "output has no access_token".to_string())
}
