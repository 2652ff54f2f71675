// Standalone MCP server binary

use anyhow::{Context, Result};
use clap::Parser;
use jira_mcp::server::McpServer;
use jira_mcp::tools::*;
use jira_mcp_core::{AtlassianClient, Settings};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "jira-mcp")]
#[command(about = "MCP server for Jira issue search and Confluence docs", long_about = None)]
struct Args {
    /// Optional TOML file with [jira] and [confluence] tables; environment variables override it
    #[arg(short, long, env = "JIRA_MCP_CONFIG", default_value = "jira-mcp.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let args = Args::parse();

    tracing::info!("Jira MCP Server starting...");

    let settings = Arc::new(
        Settings::load(&args.config).context("Failed to load configuration")?,
    );
    if settings.jira.host.is_none() {
        tracing::warn!("JIRA_HOST is not set; tool calls will report it as missing");
    }

    let client = AtlassianClient::new().context("Failed to create HTTP client")?;

    // Create tool registry
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(IssueSearchTool::new(client.clone(), settings.clone())));
    registry.register(Arc::new(DocLookupTool::new(client, settings)));

    tracing::info!("Registered {} tools", registry.list_schemas().len());

    // Start MCP server
    let server = McpServer::new(registry);
    server.start().await?;

    Ok(())
}
