//! Result of creating a post record

use serde::Deserialize;

/// Wire shape of a `com.atproto.repo.createRecord` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordResponse {
    /// AT URI of the new record
    pub uri: String,
    /// CID of the new record
    pub cid: String,
    /// Commit metadata
    #[serde(default)]
    pub commit: Option<serde_json::Value>,
    /// Lexicon validation status (e.g., "valid", "unknown")
    #[serde(default)]
    pub validation_status: Option<String>,
}

/// A successfully created post
#[derive(Debug, Clone, PartialEq)]
pub struct PostResult {
    uri: String,
    cid: String,
    commit: Option<serde_json::Value>,
    validation_status: Option<String>,
}

impl PostResult {
    /// Build a result from a parsed server response
    pub fn from_response(response: CreateRecordResponse) -> Self {
        Self {
            uri: response.uri,
            cid: response.cid,
            commit: response.commit,
            validation_status: response.validation_status,
        }
    }

    /// AT URI of the record (e.g., "at://did:plc:abc/app.bsky.feed.post/3k...")
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Content identifier of the record
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// Commit descriptor as returned by the server
    pub fn commit(&self) -> Option<&serde_json::Value> {
        self.commit.as_ref()
    }

    /// Validation status as returned by the server
    pub fn validation_status(&self) -> Option<&str> {
        self.validation_status.as_deref()
    }

    /// Record key: the last path segment of the URI
    pub fn rkey(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }
}
