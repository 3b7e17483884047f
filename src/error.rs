//! Error types for the WordPress MCP Server.

use thiserror::Error;

/// Result type alias for WordPress MCP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the WordPress MCP Server.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Backend Errors =====
    #[error("API error: {status} {status_text} - {message}")]
    Api {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("WordPress credentials not provided. {0}")]
    CredentialsNotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // ===== MCP Errors =====
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    #[error("Invalid tool schema for {tool}: {message}")]
    InvalidSchema { tool: String, message: String },

    // ===== Transport Errors =====
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Duplicate session: {0}")]
    DuplicateSession(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== HTTP Errors =====
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an API error from HTTP response details.
    pub fn api(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            status_text: status_text.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retriable (transient failures).
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || (*status >= 500 && *status < 600),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Check if this error belongs to the transport layer and should end the
    /// owning connection rather than be reported inside a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportClosed(_) | Self::SessionNotFound(_) | Self::DuplicateSession(_)
        )
    }
}
