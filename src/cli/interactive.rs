//! Line-oriented interactive session with one server.

use super::{call_and_print, display, search_and_print};
use crate::mcp::ToolClient;
use colored::Colorize;
use std::future::Future;
use std::io::{BufRead, Write};
use tokio::sync::mpsc;

/// A parsed interactive input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    Empty,
    Help,
    List,
    Info(String),
    Call { tool: String, parameters: String },
    Search(String),
    Unknown,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let (cmd, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));

        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => Self::Quit,
            "help" | "?" => Self::Help,
            "list" => Self::List,
            "info" if !rest.is_empty() => Self::Info(rest.to_string()),
            "call" => match rest.split_once(char::is_whitespace) {
                Some((tool, params)) if !params.trim().is_empty() => Self::Call {
                    tool: tool.to_string(),
                    parameters: params.trim().to_string(),
                },
                _ => Self::Unknown,
            },
            "search" if !rest.is_empty() => Self::Search(rest.to_string()),
            _ => Self::Unknown,
        }
    }
}

fn help(server: &str) {
    println!("\n{}", format!("Interactive mode for '{server}'").bold());
    println!("  list                          List all tools");
    println!("  info <tool>                   Show tool information");
    println!("  call <tool> <json-params>     Call a tool");
    println!("  search <query>                Run the server's search tool");
    println!("  quit                          Exit interactive mode");
}

/// Read commands from the terminal until `quit`, end of input, or Ctrl-C.
pub async fn run(client: &ToolClient, markers: &[String]) -> anyhow::Result<()> {
    let lines = spawn_stdin_reader()?;
    session(client, markers, lines, interrupted()).await
}

/// Forward stdin lines from a plain thread.
///
/// The thread is never joined: a read blocked on the terminal must not keep
/// the runtime alive once the session is over.
fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Resolves on the first Ctrl-C; never resolves if the handler can't be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(name: "cli.interactive.signal", error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Drive a session from `lines` until `quit`, the sender closing, or `interrupt`.
pub async fn session(
    client: &ToolClient,
    markers: &[String],
    mut lines: mpsc::Receiver<String>,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let server = client.name().to_string();
    help(&server);
    tokio::pin!(interrupt);

    loop {
        print!("\n[{server}]> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.recv() => line,
            () = &mut interrupt => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match Input::parse(&line) {
            Input::Quit => break,
            Input::Empty => {}
            Input::Help => help(&server),
            Input::List => match client.list_tools() {
                Ok(tools) => display::tools(tools, true),
                Err(e) => display::failure(&e.to_string()),
            },
            Input::Info(tool) => match client.get_tool_info(&tool) {
                Ok(info) => display::tool_info(info),
                Err(e) => display::failure(&e.to_string()),
            },
            Input::Call { tool, parameters } => call_and_print(client, &tool, &parameters).await,
            Input::Search(query) => search_and_print(client, &query, markers).await,
            Input::Unknown => display::failure("Unknown command. Type 'help' for available commands."),
        }
    }

    tracing::debug!(name: "cli.interactive.exit", server = %server, "Interactive session ended");
    println!("Goodbye!");
    Ok(())
}
