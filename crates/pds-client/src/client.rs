//! PdsClient - authenticated client for a single PDS account
//!
//! The client owns exactly one [`Session`]. It is obtained by logging in
//! with a password or by resuming from a refresh token, so there is no
//! unauthenticated client value. Before each authenticated call the access
//! token's expiry claim is checked and, if it is within the safety margin,
//! the session is renewed and swapped in whole.
//!
//! Mutating operations take `&mut self`; callers that want to post
//! concurrently must serialize access or use one client per task.
//!
//! # Example
//!
//! ```rust,no_run
//! use pds_client::PdsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client =
//!         PdsClient::create_session("alice.bsky.social", "app-password", "https://bsky.social")
//!             .await?;
//!
//!     let post = client.create_post("Hello from Rust! https://example.com", None, None).await?;
//!     println!("Created {}", post.uri());
//!
//!     Ok(())
//! }
//! ```

use crate::embed::{Embed, ImageRef};
use crate::post::{CreateRecordResponse, PostResult};
use crate::record::{CreateRecordRequest, PostRecord};
use crate::session::{Session, SessionResponse};
use crate::xrpc::{
    XrpcClient, XrpcClientConfig, XrpcRequest, CREATE_RECORD, CREATE_SESSION, REFRESH_SESSION,
    UPLOAD_BLOB,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Largest blob accepted for upload, in bytes
pub const MAX_BLOB_SIZE: usize = 10_000_000;

/// Login request parameters
#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct UploadBlobResponse {
    blob: serde_json::Value,
}

/// Client for one authenticated account on a PDS
pub struct PdsClient {
    /// XRPC transport bound to the PDS host
    xrpc: XrpcClient,
    /// Current session, replaced whole on renewal
    session: Session,
}

impl PdsClient {
    /// Log in with an identifier (handle or email) and password
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `pds` is not a usable host
    /// - [`Error::Authentication`] if the server answers anything but 200
    pub async fn create_session(
        identifier: &str,
        password: &str,
        pds: impl Into<String>,
    ) -> Result<Self> {
        Self::create_session_with_config(identifier, password, XrpcClientConfig::new(pds)).await
    }

    /// Log in using a custom transport configuration
    pub async fn create_session_with_config(
        identifier: &str,
        password: &str,
        config: XrpcClientConfig,
    ) -> Result<Self> {
        let xrpc = XrpcClient::new(config)?;

        let request = XrpcRequest::procedure(CREATE_SESSION).json_body(&LoginRequest {
            identifier,
            password,
        })?;

        let response = xrpc.send(request).await?.expect_status().map_err(|e| {
            warn!(nsid = %e.nsid, status = e.status, "session creation refused");
            Error::Authentication(e)
        })?;

        let session = Session::from_response(response.json::<SessionResponse>()?);
        debug!(did = %session.did(), handle = %session.handle(), "created session");

        Ok(Self { xrpc, session })
    }

    /// Resume from a refresh token without a password
    ///
    /// Renews immediately, so the returned client holds a fresh pair.
    pub async fn from_refresh_token(refresh_jwt: &str, pds: impl Into<String>) -> Result<Self> {
        Self::from_refresh_token_with_config(refresh_jwt, XrpcClientConfig::new(pds)).await
    }

    /// Resume from a refresh token using a custom transport configuration
    pub async fn from_refresh_token_with_config(
        refresh_jwt: &str,
        config: XrpcClientConfig,
    ) -> Result<Self> {
        let xrpc = XrpcClient::new(config)?;
        let session = request_refresh(&xrpc, refresh_jwt).await?;

        Ok(Self { xrpc, session })
    }

    /// Renew the credential pair using the stored refresh token
    ///
    /// On success the whole session is replaced with the server's answer.
    /// On failure the current session is left exactly as it was.
    pub async fn renew(&mut self) -> Result<()> {
        let session = request_refresh(&self.xrpc, self.session.refresh_jwt()).await?;
        self.session = session;
        Ok(())
    }

    /// Whether the access token outlives now plus the safety margin
    pub fn is_access_valid(&self) -> bool {
        self.session.is_access_valid()
    }

    /// Renew only if the access token is stale
    pub async fn ensure_fresh(&mut self) -> Result<()> {
        if !self.is_access_valid() {
            debug!(did = %self.session.did(), "access token stale, renewing");
            self.renew().await?;
        }
        Ok(())
    }

    /// Upload a blob to the PDS
    ///
    /// Returns the server's blob reference verbatim. Payloads over
    /// [`MAX_BLOB_SIZE`] are rejected before anything is sent. The buffer
    /// is moved into the request body.
    pub async fn upload_blob(
        &mut self,
        data: impl Into<Vec<u8>>,
        mime_type: &str,
    ) -> Result<serde_json::Value> {
        let data = data.into();
        let size = data.len();
        if size > MAX_BLOB_SIZE {
            return Err(Error::PayloadTooLarge {
                size,
                limit: MAX_BLOB_SIZE,
            });
        }

        self.ensure_fresh().await?;

        let request = XrpcRequest::procedure(UPLOAD_BLOB)
            .body(data)
            .encoding(mime_type)
            .bearer(self.session.access_jwt());

        let response = self
            .xrpc
            .send(request)
            .await?
            .expect_status()
            .map_err(remote_failure)?;

        let upload: UploadBlobResponse = response.json()?;
        debug!(size, mime_type, "uploaded blob");

        Ok(upload.blob)
    }

    /// Upload an image and pair it with alt text for an images embed
    pub async fn upload_image(
        &mut self,
        data: impl Into<Vec<u8>>,
        mime_type: &str,
        alt: impl Into<String>,
    ) -> Result<ImageRef> {
        let blob = self.upload_blob(data, mime_type).await?;
        Ok(ImageRef::new(blob, alt))
    }

    /// Create a post in the account's repository
    ///
    /// Link facets are detected in `text`. `created_at` defaults to now.
    pub async fn create_post(
        &mut self,
        text: &str,
        embed: Option<Embed>,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<PostResult> {
        self.ensure_fresh().await?;

        let record = PostRecord::build(text, embed, created_at);
        let request = XrpcRequest::procedure(CREATE_RECORD)
            .json_body(&CreateRecordRequest::post(self.session.handle(), &record))?
            .bearer(self.session.access_jwt());

        let response = self
            .xrpc
            .send(request)
            .await?
            .expect_status()
            .map_err(remote_failure)?;

        let post = PostResult::from_response(response.json::<CreateRecordResponse>()?);
        debug!(uri = %post.uri(), facets = record.facets.len(), "created post");

        Ok(post)
    }

    /// Get the current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the PDS host this client talks to
    pub fn pds(&self) -> &str {
        self.xrpc.service_url()
    }
}

/// Call `refreshSession` with `refresh_jwt` as the bearer
async fn request_refresh(xrpc: &XrpcClient, refresh_jwt: &str) -> Result<Session> {
    let request = XrpcRequest::procedure(REFRESH_SESSION).bearer(refresh_jwt);

    let response = xrpc.send(request).await?.expect_status().map_err(|e| {
        warn!(nsid = %e.nsid, status = e.status, "session renewal refused");
        Error::Authentication(e)
    })?;

    let session = Session::from_response(response.json::<SessionResponse>()?);
    debug!(did = %session.did(), "renewed session");

    Ok(session)
}

fn remote_failure(e: crate::xrpc::UnexpectedStatus) -> Error {
    warn!(nsid = %e.nsid, status = e.status, "remote operation failed");
    Error::RemoteOperation(e)
}
