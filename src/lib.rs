//! WordPress MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server that lets AI clients create, list and
//! update WordPress posts and discover taxonomies, over stdio or HTTP/SSE.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Protocol types, transports, session registry, dispatcher
//! 2. **Tools Layer** (`tools`) - The five WordPress tools
//! 3. **Backend Layer** (`wordpress`) - REST client and credential resolution
//! 4. **HTTP Front** (`http`) - SSE stream and message endpoint
//!
//! Every tool call yields a content envelope. Failures of any kind are
//! reported inside it with `isError` set, never as a dropped response.

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod tools;
pub mod wordpress;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = "1.0.0";

/// Server name advertised during initialization.
pub const SERVER_NAME: &str = "wordpress-mcp-server";
