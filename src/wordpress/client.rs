//! HTTP client for the WordPress REST API.
//!
//! The client is stateless with respect to sites: every call receives the
//! resolved [`SiteCredentials`] and authenticates with HTTP Basic auth
//! (WordPress application passwords).

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::wordpress::credentials::SiteCredentials;
use crate::wordpress::retry::{retry_read, ReadRetry};
use crate::wordpress::types::{Post, PostPayload};
use crate::VERSION;

/// Characters escaped in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// User agent string for API requests.
fn user_agent() -> String {
    format!("wordpress-mcp/{} (rust)", VERSION)
}

/// Operations the tools need from a WordPress site.
#[async_trait]
pub trait WordPressBackend: Send + Sync {
    /// Create a post.
    async fn create_post(&self, site: &SiteCredentials, post: &PostPayload) -> Result<Post>;

    /// List posts, one page at a time.
    async fn get_posts(&self, site: &SiteCredentials, per_page: u32, page: u32)
        -> Result<Vec<Post>>;

    /// Update fields of an existing post.
    async fn update_post(
        &self,
        site: &SiteCredentials,
        post_id: u64,
        post: &PostPayload,
    ) -> Result<Post>;

    /// All registered taxonomies.
    async fn get_taxonomies(&self, site: &SiteCredentials) -> Result<Vec<Value>>;

    /// Terms of one taxonomy, addressed by its REST base (`categories`, `tags`, ...).
    async fn get_taxonomy_terms(
        &self,
        site: &SiteCredentials,
        taxonomy: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Value>>;
}

/// reqwest-backed [`WordPressBackend`].
#[derive(Debug, Clone)]
pub struct WordPressClient {
    client: Client,
    read_retry: ReadRetry,
}

impl WordPressClient {
    /// Create a new client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            read_retry: ReadRetry::default(),
        })
    }

    /// Override the retry policy used for reads.
    pub fn with_read_retry(mut self, policy: ReadRetry) -> Self {
        self.read_retry = policy;
        self
    }

    fn authed(&self, builder: RequestBuilder, site: &SiteCredentials) -> RequestBuilder {
        builder.basic_auth(&site.username, Some(&site.password))
    }

    /// Send a JSON body once. Writes are not retried.
    async fn post_json<R: DeserializeOwned>(
        &self,
        site: &SiteCredentials,
        route: &str,
        body: &PostPayload,
    ) -> Result<R> {
        let url = site.endpoint(route);
        debug!("POST {}", url);

        let response = self
            .authed(self.client.post(&url), site)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// GET with paging, retried on transient failures.
    async fn get_json<R: DeserializeOwned>(
        &self,
        site: &SiteCredentials,
        route: &str,
        paging: Option<(u32, u32)>,
    ) -> Result<R> {
        let url = site.endpoint(route);

        retry_read(
            || async {
                debug!("GET {} {:?}", url, paging);
                let mut builder = self.authed(self.client.get(&url), site);
                if let Some((per_page, page)) = paging {
                    builder = builder.query(&[("per_page", per_page), ("page", page)]);
                }
                let response = builder.send().await?;
                self.handle_response(response).await
            },
            &self.read_retry,
        )
        .await
    }

    /// Handle API response, extracting errors.
    async fn handle_response<R: DeserializeOwned>(&self, response: Response) -> Result<R> {
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), status_text, body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl WordPressBackend for WordPressClient {
    async fn create_post(&self, site: &SiteCredentials, post: &PostPayload) -> Result<Post> {
        self.post_json(site, "posts", post).await
    }

    async fn get_posts(
        &self,
        site: &SiteCredentials,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Post>> {
        self.get_json(site, "posts", Some((per_page, page))).await
    }

    async fn update_post(
        &self,
        site: &SiteCredentials,
        post_id: u64,
        post: &PostPayload,
    ) -> Result<Post> {
        self.post_json(site, &format!("posts/{}", post_id), post)
            .await
    }

    async fn get_taxonomies(&self, site: &SiteCredentials) -> Result<Vec<Value>> {
        // Keyed by taxonomy slug; the tools want a list.
        let taxonomies: serde_json::Map<String, Value> =
            self.get_json(site, "taxonomies", None).await?;
        Ok(taxonomies.into_iter().map(|(_, v)| v).collect())
    }

    async fn get_taxonomy_terms(
        &self,
        site: &SiteCredentials,
        taxonomy: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Value>> {
        let route = utf8_percent_encode(taxonomy, PATH_SEGMENT).to_string();
        self.get_json(site, &route, Some((per_page, page))).await
    }
}
