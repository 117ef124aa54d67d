//! Terminal output for CLI commands.

use crate::auth::{Profile, ProfileStore};
use crate::mcp::{ToolCatalog, ToolDescriptor};
use colored::Colorize;

const RULE: usize = 60;

pub fn success(msg: &str) {
    println!("{} {msg}", "✓".green());
}

pub fn failure(msg: &str) {
    eprintln!("{} {msg}", "✗".red());
}

pub fn heading(title: &str) {
    println!("\n{}", title.bold());
    println!("{}", "=".repeat(RULE));
}

fn schema_lines(schema: &serde_json::Value, indent: &str) {
    let pretty = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    for line in pretty.lines() {
        println!("{indent}{line}");
    }
}

pub fn servers(names: &[&str]) {
    heading(&format!("Available MCP Servers ({} found)", names.len()));
    for (i, name) in names.iter().enumerate() {
        println!("{}. {}", i + 1, name.cyan());
    }
    println!();
}

fn auth_kind(profile: &Profile) -> &'static str {
    if profile.has_static_token() {
        "token"
    } else if profile.uses_delegated_auth() {
        "databricks-cli"
    } else if profile.has_basic_credentials() {
        "basic"
    } else {
        "none"
    }
}

pub fn profiles(store: &ProfileStore) {
    heading(&format!("Credential Profiles ({} found)", store.len()));
    for profile in store.iter() {
        let host = if profile.host.is_empty() { "<no host>" } else { profile.host.as_str() };
        let marker = if profile.name == store.default_name() { " (default)".green().to_string() } else { String::new() };
        println!("- {}{marker}", profile.name.cyan());
        println!("   Host: {host}");
        println!("   Auth: {}", auth_kind(profile));
    }
    println!();
}

pub fn tools(tools: &[ToolDescriptor], detailed: bool) {
    heading(&format!("Available Tools ({} found)", tools.len()));
    for (i, tool) in tools.iter().enumerate() {
        println!("\n{}. {}", i + 1, tool.name.cyan());
        println!("   Description: {}", tool.description);
        if detailed {
            if let Some(schema) = &tool.input_schema {
                println!("   Input Schema:");
                schema_lines(schema, "   ");
            }
        }
        println!("{}", "-".repeat(40).dimmed());
    }
}

pub fn tool_info(tool: &ToolDescriptor) {
    heading("Tool Information");
    println!("Name: {}", tool.name.cyan());
    println!("Description: {}", tool.description);
    if let Some(schema) = &tool.input_schema {
        println!("Input Schema:");
        schema_lines(schema, "");
    }
}

pub fn catalog(catalog: &ToolCatalog) {
    heading(&format!("Discovered Tools ({} total)", catalog.len()));
    for (name, tool) in catalog.iter() {
        println!("\n{}", name.cyan());
        println!("   Server: {}", tool.server);
        println!("   Description: {}", tool.description);
        if let Some(schema) = &tool.input_schema {
            println!("   Input Schema:");
            schema_lines(schema, "   ");
        }
        println!("{}", "-".repeat(40).dimmed());
    }
}

/// Servers drafted by `find-vector-urls`.
pub fn found_servers(doc: &serde_json::Value) {
    let Some(servers) = doc["mcpServers"].as_object() else {
        return;
    };
    heading(&format!("Vector Search URLs Found ({})", servers.len()));
    for (name, server) in servers {
        println!("{}", name.cyan());
        println!("   URL: {}", server["url"].as_str().unwrap_or_default());
        println!("   Note: {}", server["note"].as_str().unwrap_or_default());
    }
    println!();
}

/// Tool results are printed as JSON, as returned by the server.
pub fn result(value: &serde_json::Value) {
    heading("Results");
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
