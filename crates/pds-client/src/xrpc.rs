//! XRPC transport
//!
//! This module implements the small slice of XRPC (Cross-Platform Remote
//! Procedure Call) this crate speaks: JSON or raw-byte POSTs to
//! `<pds>/xrpc/<nsid>`, each checked against the single status code its
//! endpoint is expected to return.
//!
//! Reference: <https://atproto.com/specs/xrpc>

use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Well-known PDS host used when none is supplied
pub const DEFAULT_PDS: &str = "https://bsky.social";

const JSON_ENCODING: &str = "application/json";

// =============================================================================
// Endpoints
// =============================================================================

/// A remote procedure and the only status code that counts as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// NSID of the procedure (e.g., "com.atproto.repo.createRecord")
    pub nsid: &'static str,
    /// Status code a successful call returns
    pub expected_status: u16,
}

impl Endpoint {
    /// Create an endpoint definition
    pub const fn new(nsid: &'static str, expected_status: u16) -> Self {
        Self {
            nsid,
            expected_status,
        }
    }

    /// Request path relative to the PDS host
    pub fn path(&self) -> String {
        format!("/xrpc/{}", self.nsid)
    }
}

/// Password login
pub const CREATE_SESSION: Endpoint = Endpoint::new("com.atproto.server.createSession", 200);

/// Session introspection. Reserved; no operation in this crate calls it.
pub const GET_SESSION: Endpoint = Endpoint::new("com.atproto.server.getSession", 200);

/// Credential renewal, authenticated with the refresh token
pub const REFRESH_SESSION: Endpoint = Endpoint::new("com.atproto.server.refreshSession", 200);

/// Repository record creation
pub const CREATE_RECORD: Endpoint = Endpoint::new("com.atproto.repo.createRecord", 200);

/// Binary attachment upload
pub const UPLOAD_BLOB: Endpoint = Endpoint::new("com.atproto.repo.uploadBlob", 200);

// =============================================================================
// Contract Violations
// =============================================================================

/// A response whose status differs from the endpoint's expected status
///
/// Carries the status and body verbatim so callers can inspect what the
/// server actually said.
///
/// # Examples
/// ```
/// use pds_client::xrpc::UnexpectedStatus;
///
/// let err = UnexpectedStatus::new("com.atproto.server.createSession", 200, 401, "{}");
/// assert_eq!(err.status, 401);
/// assert!(err.to_string().contains("401"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnexpectedStatus {
    /// NSID of the procedure that was called
    pub nsid: String,
    /// Status the endpoint should have returned
    pub expected: u16,
    /// Status the server returned
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl UnexpectedStatus {
    /// Create a new contract violation
    pub fn new(
        nsid: impl Into<String>,
        expected: u16,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self {
            nsid: nsid.into(),
            expected,
            status,
            body: body.into(),
        }
    }
}

impl std::fmt::Display for UnexpectedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} returned HTTP {} (expected {}): {}",
            self.nsid, self.status, self.expected, self.body
        )
    }
}

impl std::error::Error for UnexpectedStatus {}

// =============================================================================
// Request Types
// =============================================================================

/// XRPC procedure call
///
/// Holds the endpoint, the optional bearer credential and the body with
/// its encoding.
#[derive(Debug, Clone)]
pub struct XrpcRequest {
    /// Endpoint being called
    pub endpoint: Endpoint,
    /// Bearer credential for the `Authorization` header
    pub bearer: Option<String>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Encoding type (e.g., "application/json", "image/png")
    pub encoding: Option<String>,
}

impl XrpcRequest {
    /// Create a new POST request (procedure)
    pub fn procedure(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            bearer: None,
            body: None,
            encoding: Some(JSON_ENCODING.to_string()),
        }
    }

    /// Authenticate the call with a bearer credential
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Set a raw request body
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> std::result::Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.body = Some(body);
        self.encoding = Some(JSON_ENCODING.to_string());
        Ok(self)
    }

    /// Set encoding type
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Merge headers for this call
    ///
    /// Later layers win: protocol defaults, then the configured `defaults`,
    /// then `Authorization` when a bearer is set.
    pub fn merged_headers(&self, defaults: &HashMap<String, String>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_ENCODING));
        if let Some(encoding) = &self.encoding {
            headers.insert(CONTENT_TYPE, header_value(encoding)?);
        }

        for (key, value) in defaults {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::InvalidInput(format!("header name {key:?}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }

        if let Some(token) = &self.bearer {
            let mut value = header_value(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidInput(format!("header value: {e}")))
}

// =============================================================================
// Response Types
// =============================================================================

/// Raw XRPC response
#[derive(Debug, Clone)]
pub struct XrpcResponse {
    /// Endpoint that produced this response
    pub endpoint: Endpoint,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl XrpcResponse {
    /// Whether the status is the one the endpoint promises
    pub fn is_expected(&self) -> bool {
        self.status == self.endpoint.expected_status
    }

    /// Keep the response only if its status matches the endpoint's
    ///
    /// Any other status, including 3xx redirects and other 2xx codes, is
    /// a contract violation.
    pub fn expect_status(self) -> std::result::Result<Self, UnexpectedStatus> {
        if self.is_expected() {
            Ok(self)
        } else {
            Err(UnexpectedStatus::new(
                self.endpoint.nsid,
                self.endpoint.expected_status,
                self.status,
                self.body,
            ))
        }
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for XRPC client
#[derive(Debug, Clone)]
pub struct XrpcClientConfig {
    /// PDS host URL (e.g., "https://bsky.social")
    pub service_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for XrpcClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_PDS.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("skywrite/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl XrpcClientConfig {
    /// Create a new config with a service URL
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Check the PDS host and return it without a trailing slash
    ///
    /// # Examples
    /// ```
    /// use pds_client::xrpc::XrpcClientConfig;
    ///
    /// let config = XrpcClientConfig::new("https://pds.example.com/");
    /// assert_eq!(config.validate().unwrap(), "https://pds.example.com");
    ///
    /// assert!(XrpcClientConfig::new("not a url").validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<String> {
        let url = Url::parse(&self.service_url)
            .map_err(|e| Error::Config(format!("invalid PDS host {:?}: {e}", self.service_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported scheme {:?} in PDS host {:?}",
                url.scheme(),
                self.service_url
            )));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::Config(format!(
                "PDS host {:?} has no host component",
                self.service_url
            )));
        }

        Ok(self.service_url.trim_end_matches('/').to_string())
    }
}

// =============================================================================
// XRPC Client Implementation
// =============================================================================

/// XRPC client for making calls to a PDS
///
/// Redirects are never followed, so a 3xx answer surfaces as an
/// [`UnexpectedStatus`] like any other wrong status.
///
/// # Examples
/// ```
/// use pds_client::xrpc::{XrpcClient, XrpcClientConfig};
///
/// let client = XrpcClient::new(XrpcClientConfig::new("https://bsky.social")).unwrap();
/// assert_eq!(client.service_url(), "https://bsky.social");
/// ```
#[derive(Debug, Clone)]
pub struct XrpcClient {
    /// HTTP client
    client: ReqwestClient,
    /// Validated host without trailing slash
    service_url: String,
    /// Configuration
    config: XrpcClientConfig,
}

impl XrpcClient {
    /// Create a new XRPC client
    ///
    /// Fails with [`Error::Config`] if the host is malformed.
    pub fn new(config: XrpcClientConfig) -> Result<Self> {
        let service_url = config.validate()?;

        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            service_url,
            config,
        })
    }

    /// Execute a procedure call and return the raw response
    ///
    /// Only transport failures are errors here; status checking is left to
    /// [`XrpcResponse::expect_status`].
    pub async fn send(&self, request: XrpcRequest) -> Result<XrpcResponse> {
        let url = format!("{}{}", self.service_url, request.endpoint.path());
        let headers = request.merged_headers(&self.config.default_headers)?;

        let mut req = self.client.post(&url).headers(headers);
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(XrpcResponse {
            endpoint: request.endpoint,
            status,
            body,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &XrpcClientConfig {
        &self.config
    }

    /// Get the validated service URL
    pub fn service_url(&self) -> &str {
        &self.service_url
    }
}

// =============================================================================
// Tests
// =============================================================================
