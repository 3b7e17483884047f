//! Taxonomy discovery tools.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::mcp::handler::{error_result, text_content, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::tools::{tool_schema, SiteContext};
use crate::wordpress::CredentialOverrides;

/// Summary line plus the raw items as pretty JSON.
fn summary_and_json(summary: String, items: &[Value]) -> Result<ToolResult> {
    Ok(ToolResult {
        content: vec![
            text_content(summary),
            text_content(serde_json::to_string_pretty(items)?),
        ],
        is_error: false,
    })
}

#[derive(Debug, Deserialize)]
pub struct GetTaxonomiesArgs {
    #[serde(flatten)]
    credentials: CredentialOverrides,
}

/// List taxonomies tool.
pub struct GetTaxonomiesTool {
    site: SiteContext,
}

impl GetTaxonomiesTool {
    pub fn new(site: SiteContext) -> Self {
        Self { site }
    }

    async fn fetch(&self, args: GetTaxonomiesArgs) -> Result<ToolResult> {
        let creds = self.site.credentials(&args.credentials)?;
        let taxonomies = self.site.backend().get_taxonomies(&creds).await?;
        summary_and_json(
            format!(
                "WordPress taxonomies retrieved successfully. Found {} taxonomies.",
                taxonomies.len()
            ),
            &taxonomies,
        )
    }
}

#[async_trait]
impl ToolHandler for GetTaxonomiesTool {
    type Args = GetTaxonomiesArgs;

    fn definition(&self) -> Tool {
        Tool {
            name: "get_taxonomies".to_string(),
            description: "Gets all taxonomies from a WordPress site".to_string(),
            input_schema: tool_schema(json!({}), &[]),
        }
    }

    async fn execute(&self, args: GetTaxonomiesArgs) -> Result<ToolResult> {
        match self.fetch(args).await {
            Ok(result) => Ok(result),
            Err(e) => Ok(error_result(format!(
                "Error getting WordPress taxonomies: {}",
                e
            ))),
        }
    }
}

fn default_terms_per_page() -> u32 {
    100
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaxonomyTermsArgs {
    taxonomy: String,
    #[serde(default = "default_terms_per_page")]
    per_page: u32,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(flatten)]
    credentials: CredentialOverrides,
}

/// List terms of one taxonomy.
pub struct GetTaxonomyTermsTool {
    site: SiteContext,
}

impl GetTaxonomyTermsTool {
    pub fn new(site: SiteContext) -> Self {
        Self { site }
    }

    async fn fetch(&self, args: GetTaxonomyTermsArgs) -> Result<ToolResult> {
        let creds = self.site.credentials(&args.credentials)?;
        let terms = self
            .site
            .backend()
            .get_taxonomy_terms(&creds, &args.taxonomy, args.per_page, args.page)
            .await?;
        summary_and_json(
            format!(
                "WordPress terms for taxonomy '{}' retrieved successfully. Found {} terms.",
                args.taxonomy,
                terms.len()
            ),
            &terms,
        )
    }
}

#[async_trait]
impl ToolHandler for GetTaxonomyTermsTool {
    type Args = GetTaxonomyTermsArgs;

    fn definition(&self) -> Tool {
        Tool {
            name: "get_taxonomy_terms".to_string(),
            description: "Gets terms for a specific taxonomy from a WordPress site".to_string(),
            input_schema: tool_schema(
                json!({
                    "taxonomy": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Taxonomy slug (e.g., 'categories', 'tags')"
                    },
                    "perPage": {
                        "type": "integer",
                        "minimum": 1,
                        "default": 100,
                        "description": "Number of terms per page (optional, default: 100)"
                    },
                    "page": {
                        "type": "integer",
                        "minimum": 1,
                        "default": 1,
                        "description": "Page number (optional, default: 1)"
                    }
                }),
                &["taxonomy"],
            ),
        }
    }

    async fn execute(&self, args: GetTaxonomyTermsArgs) -> Result<ToolResult> {
        match self.fetch(args).await {
            Ok(result) => Ok(result),
            Err(e) => Ok(error_result(format!(
                "Error getting WordPress taxonomy terms: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::McpHandler;
    use crate::mcp::protocol::ContentBlock;
    use crate::tools::register_all_tools;
    use crate::tools::testing::{defaults, FakeBackend};
    use std::sync::Arc;

    fn registry(backend: Arc<FakeBackend>) -> McpHandler {
        let mut handler = McpHandler::new();
        register_all_tools(&mut handler, backend, defaults()).unwrap();
        handler
    }

    fn block(result: &ToolResult, i: usize) -> &str {
        match &result.content[i] {
            ContentBlock::Text { text } => text,
            other => panic!("Expected text block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_taxonomies_two_blocks() {
        let handler = registry(Arc::new(FakeBackend::default()));
        let result = handler
            .get_tool("get_taxonomies")
            .unwrap()
            .invoke(json!({}))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 2);
        assert_eq!(
            block(&result, 0),
            "WordPress taxonomies retrieved successfully. Found 2 taxonomies."
        );
        let parsed: Vec<Value> = serde_json::from_str(block(&result, 1)).unwrap();
        assert_eq!(parsed[1]["rest_base"], "tags");
    }

    #[tokio::test]
    async fn test_get_taxonomy_terms() {
        let handler = registry(Arc::new(FakeBackend::default()));
        let tool = handler.get_tool("get_taxonomy_terms").unwrap();

        let result = tool.invoke(json!({"taxonomy": "categories"})).await.unwrap();
        assert_eq!(
            block(&result, 0),
            "WordPress terms for taxonomy 'categories' retrieved successfully. Found 2 terms."
        );

        let result = tool
            .invoke(json!({"taxonomy": "categories", "perPage": 1, "page": 2}))
            .await
            .unwrap();
        let parsed: Vec<Value> = serde_json::from_str(block(&result, 1)).unwrap();
        assert_eq!(parsed, vec![json!({"id": 2, "name": "Events"})]);
    }

    #[tokio::test]
    async fn test_unknown_taxonomy_is_error_envelope() {
        let handler = registry(Arc::new(FakeBackend::default()));
        let result = handler
            .get_tool("get_taxonomy_terms")
            .unwrap()
            .invoke(json!({"taxonomy": "genre"}))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(
            result.text(),
            "Error getting WordPress taxonomy terms: API error: 404 Not Found - rest_no_route"
        );
    }

    #[tokio::test]
    async fn test_taxonomy_is_required() {
        let handler = registry(Arc::new(FakeBackend::default()));
        let err = handler
            .get_tool("get_taxonomy_terms")
            .unwrap()
            .invoke(json!({"perPage": 10}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("taxonomy"));
    }
}
