//! Credential resolution for the WordPress REST API.
//!
//! Credentials are resolved in order:
//! 1. Per-call tool arguments (`siteUrl`, `username`, `password`)
//! 2. Server defaults from the command line or environment
//!    (`WORDPRESS_SITE_URL`, `WORDPRESS_USERNAME`, `WORDPRESS_PASSWORD`)

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Resolved credentials for one backend call.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteCredentials {
    /// Site root, always ending in `/`
    pub site_url: String,
    pub username: String,
    /// Application password
    pub password: String,
}

impl fmt::Debug for SiteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteCredentials")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SiteCredentials {
    /// Absolute URL of a `wp/v2` route, e.g. `posts` or `posts/12`.
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}wp-json/wp/v2/{}", self.site_url, route)
    }
}

/// Fallback credentials configured for the whole server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteDefaults {
    pub site_url: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// Per-call overrides accepted by every tool.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOverrides {
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn pick(over: &Option<String>, default: &Option<String>) -> Option<String> {
    let present = |v: &&String| !v.trim().is_empty();
    over.as_ref()
        .filter(present)
        .or(default.as_ref().filter(present))
        .cloned()
}

/// Resolve credentials from overrides, falling back to server defaults.
///
/// # Errors
///
/// Returns [`Error::CredentialsNotFound`] if any value is missing, or
/// [`Error::Config`] if the site URL is not an http(s) URL.
pub fn resolve_credentials(
    overrides: &CredentialOverrides,
    defaults: &SiteDefaults,
) -> Result<SiteCredentials> {
    let site_url = pick(&overrides.site_url, &defaults.site_url);
    let username = pick(&overrides.username, &defaults.username);
    let password = pick(&overrides.password, &defaults.password);

    let (Some(site_url), Some(username), Some(password)) = (site_url, username, password) else {
        return Err(Error::CredentialsNotFound(
            "Please provide siteUrl, username, and password parameters or set \
             WORDPRESS_SITE_URL, WORDPRESS_USERNAME, and WORDPRESS_PASSWORD environment variables."
                .to_string(),
        ));
    };

    let parsed = Url::parse(site_url.trim())
        .map_err(|e| Error::Config(format!("Invalid site URL '{}': {}", site_url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Invalid site URL '{}': expected http or https",
            site_url
        )));
    }

    let mut site_url = parsed.to_string();
    if !site_url.ends_with('/') {
        site_url.push('/');
    }

    Ok(SiteCredentials {
        site_url,
        username,
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> SiteDefaults {
        SiteDefaults {
            site_url: Some("https://blog.example.com".to_string()),
            username: Some("editor".to_string()),
            password: Some("app-pass".to_string()),
        }
    }

    #[test]
    fn test_resolve_from_defaults() {
        let creds = resolve_credentials(&CredentialOverrides::default(), &defaults()).unwrap();

        assert_eq!(creds.site_url, "https://blog.example.com/");
        assert_eq!(creds.username, "editor");
        assert_eq!(creds.password, "app-pass");
    }

    #[test]
    fn test_overrides_win() {
        let overrides = CredentialOverrides {
            site_url: Some("http://localhost:8080/wp/".to_string()),
            username: Some("admin".to_string()),
            password: None,
        };
        let creds = resolve_credentials(&overrides, &defaults()).unwrap();

        assert_eq!(creds.site_url, "http://localhost:8080/wp/");
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "app-pass");
        assert_eq!(
            creds.endpoint("posts"),
            "http://localhost:8080/wp/wp-json/wp/v2/posts"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let partial = SiteDefaults {
            password: None,
            ..defaults()
        };
        let result = resolve_credentials(&CredentialOverrides::default(), &partial);
        assert!(matches!(result, Err(Error::CredentialsNotFound(_))));

        let blank = CredentialOverrides {
            password: Some("  ".to_string()),
            ..CredentialOverrides::default()
        };
        let result = resolve_credentials(&blank, &partial);
        assert!(matches!(result, Err(Error::CredentialsNotFound(_))));
    }

    #[test]
    fn test_invalid_site_url() {
        let overrides = CredentialOverrides {
            site_url: Some("ftp://example.com".to_string()),
            ..CredentialOverrides::default()
        };
        assert!(matches!(
            resolve_credentials(&overrides, &defaults()),
            Err(Error::Config(_))
        ));

        let overrides = CredentialOverrides {
            site_url: Some("not a url".to_string()),
            ..CredentialOverrides::default()
        };
        assert!(matches!(
            resolve_credentials(&overrides, &defaults()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = resolve_credentials(&CredentialOverrides::default(), &defaults()).unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("app-pass"));
        assert!(debug.contains("<redacted>"));
    }
}
