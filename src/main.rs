//! WordPress MCP Server - Rust Implementation
//!
//! Exposes WordPress content tools to MCP clients over stdio or HTTP/SSE.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wordpress_mcp::config::{Args, Config, Transport};
use wordpress_mcp::error::Result;
use wordpress_mcp::mcp::handler::McpHandler;
use wordpress_mcp::mcp::server::McpServer;
use wordpress_mcp::mcp::transport::StdioTransport;
use wordpress_mcp::tools;
use wordpress_mcp::wordpress::WordPressClient;
use wordpress_mcp::{SERVER_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file is optional
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging. Stdout carries the stdio transport.
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
            .expect("Failed to set tracing subscriber");
    } else {
        tracing::subscriber::set_global_default(builder.finish())
            .expect("Failed to set tracing subscriber");
    }

    // Build configuration from args
    let config: Config = args.into();

    info!("WordPress MCP Server v{}", VERSION);
    info!("Transport: {:?}", config.transport);
    match config.site.site_url.as_deref() {
        Some(url) => info!("Default site: {}", url),
        None => info!("No default site configured; tools must pass siteUrl"),
    }

    let backend = Arc::new(WordPressClient::new(config.request_timeout())?);

    // Create MCP handler and register tools
    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, backend, config.site_defaults())?;
    info!("Registered {} MCP tools", handler.tool_count());

    let server = McpServer::new(handler, SERVER_NAME);

    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            server.run(StdioTransport::new()).await?;
        }
        Transport::Sse => {
            info!("Starting SSE transport on {}...", config.bind_addr());
            wordpress_mcp::http::start_server(&config, server).await?;
        }
    }

    Ok(())
}
