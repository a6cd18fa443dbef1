//! Client configuration options.

use std::time::Duration;

use url::Url;

use crate::Result;

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Versioned media type sent in every `Accept` header.
pub const DEFAULT_MEDIA_TYPE: &str = "application/vnd.github.v3.full+json";

/// Media type that asks search endpoints for text-match metadata.
pub const TEXT_MATCH_MEDIA_TYPE: &str = "application/vnd.github.v3.full.text-match+json";

/// Largest page the server will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Configuration for a [`Session`](crate::Session).
///
/// # Example
///
/// ```
/// use hubkit::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Value of the `Accept` header
    pub media_type: String,
    /// Page size requested for unbounded or large iterations
    pub max_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("hubkit/{} (Rust)", env!("CARGO_PKG_VERSION")),
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a self-hosted installation reachable at `url`.
    ///
    /// The API lives under `<url>/api/v3`.
    pub fn enterprise(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        let root = parsed.as_str().trim_end_matches('/');
        Ok(Self::default().with_base_url(format!("{root}/api/v3")))
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the media type sent in the `Accept` header.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Set the page size used when many items are requested.
    ///
    /// Clamped to `1..=100`.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}
