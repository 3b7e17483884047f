//! Model Context Protocol (MCP) implementation.
//!
//! This module provides the server side of MCP: JSON-RPC message handling,
//! transport layers, session tracking and tool registration.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `server` - Request dispatcher
//! - `transport` - Transport layer (stdio, HTTP/SSE)
//! - `session` - Registry of live SSE sessions
//! - `handler` - Tool registry and handler traits

pub mod handler;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use handler::{McpHandler, ToolHandler};
pub use protocol::*;
pub use server::McpServer;
pub use session::{SessionGuard, SessionRegistry};
pub use transport::{LineTransport, Message, SseTransport, StdioTransport, Transport};
