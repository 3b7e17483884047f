//! WordPress REST payloads.
//!
//! Only the fields the tools render are modeled; taxonomy and term
//! descriptors pass through as raw JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Post status as accepted by `wp/v2/posts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
    Private,
    /// Scheduled for publication at the post's date.
    Future,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
            PostStatus::Private => "private",
            PostStatus::Future => "future",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-facing label for a status string returned by WordPress.
pub fn display_status(status: &str) -> &str {
    if status == PostStatus::Future.as_str() {
        "Scheduled"
    } else {
        status
    }
}

/// A `{ "rendered": ... }` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A post as returned by WordPress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    #[serde(default)]
    pub title: Rendered,
    /// Kept as a string: WordPress reports statuses (`pending`, `trash`, ...)
    /// that tools never send.
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Body for creating or updating a post. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Taxonomy rest base (`categories`, `tags`, custom) → term ids.
    #[serde(flatten)]
    pub taxonomies: BTreeMap<String, Vec<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(PostStatus::Publish).unwrap(), json!("publish"));
        assert_eq!(
            serde_json::from_value::<PostStatus>(json!("future")).unwrap(),
            PostStatus::Future
        );
        assert_eq!(PostStatus::default(), PostStatus::Draft);
    }

    #[test]
    fn test_display_status() {
        assert_eq!(display_status("future"), "Scheduled");
        assert_eq!(display_status("publish"), "publish");
        assert_eq!(display_status("pending"), "pending");
    }

    #[test]
    fn test_post_from_rest_response() {
        let post: Post = serde_json::from_value(json!({
            "id": 42,
            "date": "2030-01-01T10:00:00",
            "status": "future",
            "title": { "rendered": "Hello" },
            "link": "https://example.com/?p=42",
            "content": { "rendered": "<p>ignored</p>" }
        }))
        .unwrap();

        assert_eq!(post.id, 42);
        assert_eq!(post.title.rendered, "Hello");
        assert_eq!(post.status, "future");
    }

    #[test]
    fn test_payload_flattens_taxonomies() {
        let mut payload = PostPayload {
            title: Some("T".to_string()),
            status: Some(PostStatus::Publish),
            ..PostPayload::default()
        };
        payload.taxonomies.insert("categories".to_string(), vec![1, 2]);
        payload.taxonomies.insert("genre".to_string(), vec![9]);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "T",
                "status": "publish",
                "categories": [1, 2],
                "genre": [9]
            })
        );
    }
}
