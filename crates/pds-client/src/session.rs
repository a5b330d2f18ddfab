//! AT Protocol Session State
//!
//! This module holds the credential pair and account metadata a PDS returns
//! from `createSession` and `refreshSession`, plus the client-side freshness
//! check on the access token.
//!
//! The access token's claims are decoded *without* signature verification.
//! The expiry claim is only a hint for when to renew; the server remains the
//! authority on whether a token is accepted.
//!
//! # Example
//!
//! ```rust
//! use pds_client::session::{Session, SessionResponse};
//!
//! let response: SessionResponse = serde_json::from_value(serde_json::json!({
//!     "accessJwt": "access",
//!     "refreshJwt": "refresh",
//!     "handle": "alice.bsky.social",
//!     "did": "did:plc:abc123",
//! }))
//! .unwrap();
//!
//! let session = Session::from_response(response);
//! assert_eq!(session.did(), "did:plc:abc123");
//! assert!(session.email().is_none());
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds before expiry at which an access token is already treated as stale
pub const ACCESS_EXPIRY_MARGIN_SECS: i64 = 10;

/// Errors that can occur while reading a credential
#[derive(Debug, Error)]
pub enum SessionError {
    /// JWT parsing error
    #[error("JWT parsing error: {0}")]
    JwtParseError(String),

    /// JWT payload is not valid JSON claims
    #[error("JWT claims error: {0}")]
    JwtClaimsError(#[from] serde_json::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// An account's decentralized identifier and its document
///
/// The document is kept as the raw JSON the server sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DidDoc {
    did: String,
    doc: Option<serde_json::Value>,
}

impl DidDoc {
    /// Create a DID document holder
    pub fn new(did: impl Into<String>, doc: Option<serde_json::Value>) -> Self {
        Self {
            did: did.into(),
            doc,
        }
    }

    /// The DID (e.g., "did:plc:abc123")
    pub fn did(&self) -> &str {
        &self.did
    }

    /// The raw DID document, if the server returned one
    pub fn doc(&self) -> Option<&serde_json::Value> {
        self.doc.as_ref()
    }
}

/// Wire shape of `createSession` and `refreshSession` responses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Access JWT token
    pub access_jwt: String,
    /// Refresh JWT token
    pub refresh_jwt: String,
    /// User handle
    pub handle: String,
    /// User DID
    pub did: String,
    /// DID document
    #[serde(default)]
    pub did_doc: Option<serde_json::Value>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Email confirmed
    #[serde(default)]
    pub email_confirmed: Option<bool>,
    /// Email auth factor enabled
    #[serde(default)]
    pub email_auth_factor: Option<bool>,
    /// Account active
    #[serde(default)]
    pub active: Option<bool>,
    /// Account status (e.g., "takendown", "suspended", "deactivated")
    #[serde(default)]
    pub status: Option<String>,
}

/// An authenticated session
///
/// The access and refresh tokens always come from the same server response.
/// A session is never edited after construction; renewal builds a new one
/// and the owner swaps it in whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    access_jwt: String,
    refresh_jwt: String,
    handle: String,
    did_doc: DidDoc,
    email: Option<String>,
    email_confirmed: Option<bool>,
    email_auth_factor: Option<bool>,
    active: Option<bool>,
    status: Option<String>,
}

impl Session {
    /// Build a session from a parsed server response
    pub fn from_response(response: SessionResponse) -> Self {
        Self {
            access_jwt: response.access_jwt,
            refresh_jwt: response.refresh_jwt,
            handle: response.handle,
            did_doc: DidDoc::new(response.did, response.did_doc),
            email: response.email,
            email_confirmed: response.email_confirmed,
            email_auth_factor: response.email_auth_factor,
            active: response.active,
            status: response.status,
        }
    }

    /// Short-lived bearer token for authenticated calls
    pub fn access_jwt(&self) -> &str {
        &self.access_jwt
    }

    /// Longer-lived bearer token used only for renewal
    pub fn refresh_jwt(&self) -> &str {
        &self.refresh_jwt
    }

    /// Account handle (e.g., "alice.bsky.social")
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Account DID
    pub fn did(&self) -> &str {
        self.did_doc.did()
    }

    /// DID and raw DID document
    pub fn did_doc(&self) -> &DidDoc {
        &self.did_doc
    }

    /// Email address
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Whether the email has been confirmed
    pub fn email_confirmed(&self) -> Option<bool> {
        self.email_confirmed
    }

    /// Whether email is used as an auth factor
    pub fn email_auth_factor(&self) -> Option<bool> {
        self.email_auth_factor
    }

    /// Whether the account is active
    pub fn active(&self) -> Option<bool> {
        self.active
    }

    /// Account status
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Whether the access token outlives now plus the safety margin
    pub fn is_access_valid(&self) -> bool {
        is_jwt_valid_at(
            &self.access_jwt,
            Utc::now(),
            Duration::seconds(ACCESS_EXPIRY_MARGIN_SECS),
        )
    }
}

/// Decoded JWT payload
///
/// Claims are kept as raw JSON and only read on demand, so a claim of an
/// unexpected type never hides the ones that are well formed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JwtClaims(serde_json::Map<String, serde_json::Value>);

impl JwtClaims {
    /// Raw value of any claim
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// Subject (DID), if it is a string
    pub fn sub(&self) -> Option<&str> {
        self.get("sub").and_then(serde_json::Value::as_str)
    }

    /// Scope (e.g., "com.atproto.access" for access tokens), if it is a string
    pub fn scope(&self) -> Option<&str> {
        self.get("scope").and_then(serde_json::Value::as_str)
    }

    /// Expiration as a NumericDate; fractional seconds are allowed
    pub fn exp(&self) -> Option<f64> {
        self.get("exp").and_then(serde_json::Value::as_f64)
    }
}

/// Parse JWT claims without validation
///
/// Only the payload segment is read. The header and signature are not
/// inspected, so tokens signed with any algorithm (ES256K included) decode.
/// The payload must be a JSON object.
///
/// # Example
///
/// ```rust
/// use pds_client::session::parse_jwt_claims;
///
/// let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiJkaWQ6cGxjOmFiYzEyMyIsImV4cCI6MTcwMDAwMDAwMH0.signature";
/// let claims = parse_jwt_claims(token).unwrap();
/// assert_eq!(claims.sub(), Some("did:plc:abc123"));
/// assert_eq!(claims.exp(), Some(1700000000.0));
/// ```
pub fn parse_jwt_claims(token: &str) -> Result<JwtClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(SessionError::JwtParseError(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::JwtParseError(format!("payload is not base64url: {e}")))?;

    Ok(serde_json::from_slice(&bytes)?)
}

/// Get the expiration time from a JWT token
///
/// Only the `exp` claim is consulted. It may be an integer or a fractional
/// number of seconds since the epoch.
pub fn jwt_expiration(token: &str) -> Result<DateTime<Utc>> {
    let claims = parse_jwt_claims(token)?;
    let raw = claims
        .get("exp")
        .ok_or_else(|| SessionError::MissingField("exp".to_string()))?;
    let exp = claims
        .exp()
        .ok_or_else(|| SessionError::JwtParseError(format!("exp {raw} is not a number")))?;

    let secs = exp.floor();
    let nanos = ((exp - secs) * 1e9) as u32;
    if !secs.is_finite() || secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return Err(SessionError::JwtParseError(format!("exp {exp} is out of range")));
    }

    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
        .ok_or_else(|| SessionError::JwtParseError(format!("exp {exp} is out of range")))
}

/// Check whether a token is still valid at `now` with `margin` to spare
///
/// Returns false when the expiry is missing, malformed, or not strictly
/// later than `now + margin`.
pub fn is_jwt_valid_at(token: &str, now: DateTime<Utc>, margin: Duration) -> bool {
    match jwt_expiration(token) {
        Ok(exp_time) => exp_time > now + margin,
        Err(_) => false,
    }
}
