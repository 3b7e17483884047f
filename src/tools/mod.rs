//! MCP tool implementations.
//!
//! - `posts` - Create, list and update posts (3 tools)
//! - `taxonomies` - Discover taxonomies and their terms (2 tools)
//!
//! Every tool resolves credentials per call, so one server can front several
//! sites.

pub mod posts;
pub mod taxonomies;

use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::McpHandler;
use crate::wordpress::{resolve_credentials, CredentialOverrides, SiteCredentials, SiteDefaults, WordPressBackend};

/// Backend and fallback credentials shared by every tool.
#[derive(Clone)]
pub struct SiteContext {
    backend: Arc<dyn WordPressBackend>,
    defaults: Arc<SiteDefaults>,
}

impl SiteContext {
    pub fn new(backend: Arc<dyn WordPressBackend>, defaults: SiteDefaults) -> Self {
        Self {
            backend,
            defaults: Arc::new(defaults),
        }
    }

    pub fn backend(&self) -> &dyn WordPressBackend {
        self.backend.as_ref()
    }

    pub fn credentials(&self, overrides: &CredentialOverrides) -> Result<SiteCredentials> {
        resolve_credentials(overrides, &self.defaults)
    }
}

/// Register all tools with the handler.
pub fn register_all_tools(
    handler: &mut McpHandler,
    backend: Arc<dyn WordPressBackend>,
    defaults: SiteDefaults,
) -> Result<()> {
    let site = SiteContext::new(backend, defaults);

    // Post tools (3)
    handler.register(posts::CreatePostTool::new(site.clone()))?;
    handler.register(posts::GetPostsTool::new(site.clone()))?;
    handler.register(posts::UpdatePostTool::new(site.clone()))?;

    // Taxonomy tools (2)
    handler.register(taxonomies::GetTaxonomiesTool::new(site.clone()))?;
    handler.register(taxonomies::GetTaxonomyTermsTool::new(site))?;

    Ok(())
}

/// Build an object schema from tool-specific properties, adding the
/// credential overrides every tool accepts.
pub(crate) fn tool_schema(properties: Value, required: &[&str]) -> Value {
    let mut props = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    props.insert(
        "siteUrl".to_string(),
        json!({
            "type": "string",
            "description": "WordPress site URL (optional if set in env)"
        }),
    );
    props.insert(
        "username".to_string(),
        json!({
            "type": "string",
            "description": "WordPress username (optional if set in env)"
        }),
    );
    props.insert(
        "password".to_string(),
        json!({
            "type": "string",
            "description": "WordPress application password (optional if set in env)"
        }),
    );

    json!({
        "type": "object",
        "properties": props,
        "required": required
    })
}
