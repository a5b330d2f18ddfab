//! AT Protocol PDS Client Library
//!
//! This crate implements the posting side of an AT Protocol client: session
//! creation and renewal against a personal data server (PDS), blob upload,
//! rich text link facets, and `app.bsky.feed.post` record creation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod embed;
pub mod post;
pub mod record;
pub mod richtext;
pub mod session;
pub mod xrpc;

pub use client::{PdsClient, MAX_BLOB_SIZE};
pub use embed::{Embed, ImageRef};
pub use post::PostResult;
pub use record::{PostRecord, POST_COLLECTION};
pub use richtext::{extract_facets, ByteSlice, Facet, FacetFeature, Link};
pub use session::{DidDoc, Session};
pub use xrpc::{UnexpectedStatus, XrpcClientConfig, DEFAULT_PDS};

/// Result type for PDS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for PDS operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed PDS host, detected before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session creation or renewal was refused
    #[error("Authentication error: {0}")]
    Authentication(UnexpectedStatus),

    /// Blob exceeds the upload limit; nothing was sent
    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Size of the rejected payload
        size: usize,
        /// Maximum accepted size
        limit: usize,
    },

    /// Blob upload or record creation returned an unexpected status
    #[error("Remote operation failed: {0}")]
    RemoteOperation(UnexpectedStatus),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// HTTP status of a refused remote call, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication(e) | Error::RemoteOperation(e) => Some(e.status),
            _ => None,
        }
    }

    /// Raw response body of a refused remote call, if this error carries one
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::Authentication(e) | Error::RemoteOperation(e) => Some(&e.body),
            _ => None,
        }
    }
}
