//! WordPress REST API backend.
//!
//! - `client` - Backend trait and the reqwest implementation
//! - `credentials` - Per-call credential resolution
//! - `retry` - Retries for idempotent reads
//! - `types` - Post and status payloads

pub mod client;
pub mod credentials;
pub mod retry;
pub mod types;

pub use client::{WordPressBackend, WordPressClient};
pub use credentials::{resolve_credentials, CredentialOverrides, SiteCredentials, SiteDefaults};
pub use retry::ReadRetry;
pub use types::{display_status, Post, PostPayload, PostStatus};
