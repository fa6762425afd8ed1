//! TUS protocol HTTP client
//!
//! Provides a thin wrapper over `reqwest::Client` that pins the protocol
//! version header on every request and handles base-URL construction,
//! including resolution of relative `Location` headers returned by the
//! create step.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hauler_tus::TusClient;
//!
//! let client = TusClient::new("https://files.example.com");
//! ```

use reqwest::{Client, Method, RequestBuilder};

/// Protocol version sent (and expected) in the `Tus-Resumable` header
pub const TUS_VERSION: &str = "1.0.0";

/// Header carrying the protocol version
pub const TUS_RESUMABLE: &str = "Tus-Resumable";

/// Header carrying the server's acknowledged byte count
pub const UPLOAD_OFFSET: &str = "Upload-Offset";

/// Header carrying the declared total file size on create
pub const UPLOAD_LENGTH: &str = "Upload-Length";

/// Header carrying the base64-encoded key/value metadata pairs
pub const UPLOAD_METADATA: &str = "Upload-Metadata";

/// Content type required for chunk append requests
pub const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// HTTP client for a TUS-style upload endpoint
///
/// Wraps `reqwest::Client` with the protocol version header and base URL
/// construction. Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct TusClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL of the upload endpoint, without a trailing slash
    base_url: String,
}

impl TusClient {
    /// Creates a new client for the given endpoint base URL
    ///
    /// # Arguments
    /// * `base_url` - e.g. `https://files.example.com` (trailing slash stripped)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest::Client`
    ///
    /// Useful when the host application already maintains a connection pool
    /// with custom timeouts or TLS settings.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Returns the endpoint base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request builder for a path relative to the base URL
    ///
    /// Adds the `Tus-Resumable` version header.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Path relative to the base URL (e.g. `/upload`)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.request_url(method, &url)
    }

    /// Creates a request builder for an absolute URL (upload handles are
    /// absolute once resolved)
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(TUS_RESUMABLE, TUS_VERSION)
    }

    /// Resolves a `Location` header value against the base URL
    ///
    /// Servers may return either an absolute URL or a path relative to the
    /// endpoint root.
    pub fn resolve_location(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{}", self.base_url, location)
        } else {
            format!("{}/{}", self.base_url, location)
        }
    }
}
