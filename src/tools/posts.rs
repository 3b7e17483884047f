//! Post tools: create, list and update.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::{error_result, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::tools::{tool_schema, SiteContext};
use crate::wordpress::{display_status, CredentialOverrides, PostPayload, PostStatus};

const SCHEDULED_NOTE: &str = " (Post will be scheduled)";

/// Post fields a custom taxonomy name would collide with in the request body.
const RESERVED_POST_FIELDS: [&str; 4] = ["title", "content", "status", "date"];

/// Parse an ISO 8601 date. Values without an offset are taken as UTC.
fn parse_post_date(date: &str) -> Result<DateTime<Utc>> {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(Error::InvalidDate(format!(
        "'{}' is not an ISO 8601 date (e.g. 2023-12-31T23:59:59)",
        date
    )))
}

/// Status actually sent to WordPress, and whether the post gets scheduled.
///
/// A `publish` request dated in the future is sent as `future`.
fn schedule(
    status: Option<PostStatus>,
    date: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(Option<PostStatus>, bool)> {
    let Some(date) = date else {
        return Ok((status, false));
    };
    let at = parse_post_date(date)?;

    if status == Some(PostStatus::Publish) && at > now {
        debug!("Scheduling post for {}", at);
        Ok((Some(PostStatus::Future), true))
    } else {
        Ok((status, false))
    }
}

/// Taxonomy assignments in request order: categories, tags, then custom.
fn collect_taxonomies(
    categories: Option<Vec<u64>>,
    tags: Option<Vec<u64>>,
    custom: Option<BTreeMap<String, Vec<u64>>>,
) -> Vec<(String, Vec<u64>)> {
    let mut assigned: Vec<(String, Vec<u64>)> = Vec::new();
    if let Some(ids) = categories.filter(|ids| !ids.is_empty()) {
        assigned.push(("categories".to_string(), ids));
    }
    if let Some(ids) = tags.filter(|ids| !ids.is_empty()) {
        assigned.push(("tags".to_string(), ids));
    }
    for (taxonomy, ids) in custom.unwrap_or_default() {
        match assigned.iter_mut().find(|(name, _)| *name == taxonomy) {
            Some(slot) => slot.1 = ids,
            None => assigned.push((taxonomy, ids)),
        }
    }
    assigned
}

fn taxonomy_lines(heading: &str, assigned: &[(String, Vec<u64>)]) -> String {
    if assigned.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{}:", heading);
    for (taxonomy, ids) in assigned {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!("\n- {}: {}", taxonomy, ids.join(", ")));
    }
    out
}

fn date_line(date: Option<&str>, scheduled: bool) -> String {
    match date {
        Some(date) => format!("\nDate: {}{}", date, if scheduled { SCHEDULED_NOTE } else { "" }),
        None => String::new(),
    }
}

fn taxonomy_schema() -> serde_json::Value {
    json!({
        "categories": {
            "type": "array",
            "items": { "type": "integer", "minimum": 0 },
            "description": "Array of category IDs to assign to the post"
        },
        "tags": {
            "type": "array",
            "items": { "type": "integer", "minimum": 0 },
            "description": "Array of tag IDs to assign to the post"
        },
        "taxonomies": {
            "type": "object",
            "propertyNames": { "not": { "enum": RESERVED_POST_FIELDS } },
            "additionalProperties": {
                "type": "array",
                "items": { "type": "integer", "minimum": 0 }
            },
            "description": "Custom taxonomies to assign (format: {taxonomy_name: [term_ids]})"
        },
        "date": {
            "type": "string",
            "description": "Specific date for the post in ISO 8601 format (e.g., '2023-12-31T23:59:59'). If date is in the future and status is 'publish', post will be scheduled."
        }
    })
}

fn merge(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(base), serde_json::Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

// ===== create_post =====

#[derive(Debug, Deserialize)]
pub struct CreatePostArgs {
    title: String,
    content: String,
    #[serde(default)]
    status: PostStatus,
    categories: Option<Vec<u64>>,
    tags: Option<Vec<u64>>,
    taxonomies: Option<BTreeMap<String, Vec<u64>>>,
    date: Option<String>,
    #[serde(flatten)]
    credentials: CredentialOverrides,
}

/// Create post tool.
pub struct CreatePostTool {
    site: SiteContext,
}

impl CreatePostTool {
    pub fn new(site: SiteContext) -> Self {
        Self { site }
    }

    async fn create(&self, args: CreatePostArgs) -> Result<String> {
        let creds = self.site.credentials(&args.credentials)?;
        let (status, scheduled) = schedule(Some(args.status), args.date.as_deref(), Utc::now())?;
        let assigned = collect_taxonomies(args.categories, args.tags, args.taxonomies);

        let payload = PostPayload {
            title: Some(args.title),
            content: Some(args.content),
            status,
            date: args.date.clone(),
            taxonomies: assigned.iter().cloned().collect(),
        };
        let post = self.site.backend().create_post(&creds, &payload).await?;

        Ok(format!(
            "Successfully created WordPress post with ID: {}\nTitle: {}\nStatus: {}{}{}",
            post.id,
            post.title.rendered,
            display_status(&post.status),
            date_line(args.date.as_deref(), scheduled),
            taxonomy_lines("Assigned taxonomies", &assigned)
        ))
    }
}

#[async_trait]
impl ToolHandler for CreatePostTool {
    type Args = CreatePostArgs;

    fn definition(&self) -> Tool {
        Tool {
            name: "create_post".to_string(),
            description: "Creates a new WordPress post".to_string(),
            input_schema: tool_schema(
                merge(
                    json!({
                        "title": { "type": "string", "description": "Post title" },
                        "content": { "type": "string", "description": "Post content" },
                        "status": {
                            "type": "string",
                            "enum": ["draft", "publish", "private", "future"],
                            "default": "draft",
                            "description": "Post status (optional, default: 'draft'). Note: If a future date is provided with 'publish' status, it will automatically be scheduled (API status: 'future')."
                        }
                    }),
                    taxonomy_schema(),
                ),
                &["title", "content"],
            ),
        }
    }

    async fn execute(&self, args: CreatePostArgs) -> Result<ToolResult> {
        match self.create(args).await {
            Ok(text) => Ok(success_result(text)),
            Err(e) => {
                warn!("create_post failed: {}", e);
                Ok(error_result(format!("Error creating WordPress post: {}", e)))
            }
        }
    }
}

// ===== get_posts =====

fn default_per_page() -> u32 {
    10
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPostsArgs {
    #[serde(default = "default_per_page")]
    per_page: u32,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(flatten)]
    credentials: CredentialOverrides,
}

/// List posts tool.
pub struct GetPostsTool {
    site: SiteContext,
}

impl GetPostsTool {
    pub fn new(site: SiteContext) -> Self {
        Self { site }
    }

    async fn list(&self, args: GetPostsArgs) -> Result<String> {
        let creds = self.site.credentials(&args.credentials)?;
        let posts = self
            .site
            .backend()
            .get_posts(&creds, args.per_page, args.page)
            .await?;

        let lines: Vec<String> = posts
            .iter()
            .map(|p| format!("ID: {}, Title: {}, Status: {}", p.id, p.title.rendered, p.status))
            .collect();
        Ok(format!(
            "Retrieved {} WordPress posts:\n{}",
            posts.len(),
            lines.join("\n")
        ))
    }
}

#[async_trait]
impl ToolHandler for GetPostsTool {
    type Args = GetPostsArgs;

    fn definition(&self) -> Tool {
        Tool {
            name: "get_posts".to_string(),
            description: "Retrieves WordPress posts".to_string(),
            input_schema: tool_schema(
                json!({
                    "perPage": {
                        "type": "integer",
                        "minimum": 1,
                        "default": 10,
                        "description": "Number of posts per page (optional, default: 10)"
                    },
                    "page": {
                        "type": "integer",
                        "minimum": 1,
                        "default": 1,
                        "description": "Page number (optional, default: 1)"
                    }
                }),
                &[],
            ),
        }
    }

    async fn execute(&self, args: GetPostsArgs) -> Result<ToolResult> {
        match self.list(args).await {
            Ok(text) => Ok(success_result(text)),
            Err(e) => Ok(error_result(e.to_string())),
        }
    }
}

// ===== update_post =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostArgs {
    post_id: u64,
    title: Option<String>,
    content: Option<String>,
    status: Option<PostStatus>,
    categories: Option<Vec<u64>>,
    tags: Option<Vec<u64>>,
    taxonomies: Option<BTreeMap<String, Vec<u64>>>,
    date: Option<String>,
    #[serde(flatten)]
    credentials: CredentialOverrides,
}

/// Update post tool.
pub struct UpdatePostTool {
    site: SiteContext,
}

impl UpdatePostTool {
    pub fn new(site: SiteContext) -> Self {
        Self { site }
    }

    async fn update(&self, args: UpdatePostArgs) -> Result<String> {
        let creds = self.site.credentials(&args.credentials)?;
        let (status, scheduled) = schedule(args.status, args.date.as_deref(), Utc::now())?;
        let assigned = collect_taxonomies(args.categories, args.tags, args.taxonomies);

        let payload = PostPayload {
            title: args.title,
            content: args.content,
            status,
            date: args.date.clone(),
            taxonomies: assigned.iter().cloned().collect(),
        };
        let post = self
            .site
            .backend()
            .update_post(&creds, args.post_id, &payload)
            .await?;

        Ok(format!(
            "WordPress post updated successfully. Post ID: {}\nStatus: {}{}{}",
            post.id,
            display_status(&post.status),
            date_line(args.date.as_deref(), scheduled),
            taxonomy_lines("Updated taxonomies", &assigned)
        ))
    }
}

#[async_trait]
impl ToolHandler for UpdatePostTool {
    type Args = UpdatePostArgs;

    fn definition(&self) -> Tool {
        Tool {
            name: "update_post".to_string(),
            description: "Updates an existing WordPress post".to_string(),
            input_schema: tool_schema(
                merge(
                    json!({
                        "postId": { "type": "integer", "minimum": 1, "description": "Post ID to update" },
                        "title": { "type": "string", "description": "New post title (optional)" },
                        "content": { "type": "string", "description": "New post content (optional)" },
                        "status": {
                            "type": "string",
                            "enum": ["draft", "publish", "private", "future"],
                            "description": "New post status (optional). Note: If a future date is provided with 'publish' status, it will automatically be scheduled (API status: 'future')."
                        }
                    }),
                    taxonomy_schema(),
                ),
                &["postId"],
            ),
        }
    }

    async fn execute(&self, args: UpdatePostArgs) -> Result<ToolResult> {
        match self.update(args).await {
            Ok(text) => Ok(success_result(text)),
            Err(e) => {
                warn!("update_post failed: {}", e);
                Ok(error_result(format!("Error updating WordPress post: {}", e)))
            }
        }
    }
}
