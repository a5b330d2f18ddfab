//! Skywrite
//!
//! A small convenience layer over [`pds_client`]: log in, post text with
//! optional images, and get back a shareable web URL.
//!
//! ```rust,no_run
//! use skywrite::{Client, ImageAttachment};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::from_app_password("alice.bsky.social", "app-password", None).await?;
//!
//!     let photo = ImageAttachment::new(std::fs::read("cat.png")?, "image/png").with_alt("my cat");
//!     let post = client.post("Look at this", vec![photo]).await?;
//!     println!("{}", post.http_uri());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub use pds_client;

use pds_client::{Embed, PdsClient, PostResult, DEFAULT_PDS};
use serde_json::{Map, Value};
use thiserror::Error;

/// Most images a single post may embed
pub const MAX_IMAGES: usize = 4;

/// Errors from the convenience layer
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the underlying PDS client
    #[error(transparent)]
    Client(#[from] pds_client::Error),

    /// More images than one post can carry
    #[error("too many images: {count} exceeds maximum of {max}")]
    TooManyImages {
        /// Number of images supplied
        count: usize,
        /// Maximum allowed
        max: usize,
    },
}

/// Result type for convenience operations
pub type Result<T> = std::result::Result<T, Error>;

/// An image to attach to a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Media type (e.g., "image/png")
    pub mime_type: String,
    /// Alt text
    pub alt: String,
}

impl ImageAttachment {
    /// Create an attachment with empty alt text
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            alt: String::new(),
        }
    }

    /// Set the alt text
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }
}

/// A created post together with the handle of the repository it lives in
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    raw: PostResult,
    repo: String,
}

impl Post {
    /// Wrap a raw result
    pub fn new(raw: PostResult, repo: impl Into<String>) -> Self {
        Self {
            raw,
            repo: repo.into(),
        }
    }

    /// Public web URL of the post on bsky.app
    pub fn http_uri(&self) -> String {
        format!(
            "https://bsky.app/profile/{}/post/{}",
            self.repo,
            self.raw.rkey()
        )
    }

    /// The raw creation result
    pub fn raw(&self) -> &PostResult {
        &self.raw
    }
}

/// Logged-in posting client
pub struct Client {
    inner: PdsClient,
}

impl Client {
    /// Log in with an app password; `pds` defaults to bsky.social
    pub async fn from_app_password(
        identifier: &str,
        password: &str,
        pds: Option<&str>,
    ) -> Result<Self> {
        let inner =
            PdsClient::create_session(identifier, password, pds.unwrap_or(DEFAULT_PDS)).await?;
        Ok(Self { inner })
    }

    /// Resume from a refresh JWT saved earlier; `pds` defaults to bsky.social
    pub async fn from_refresh_jwt(refresh_jwt: &str, pds: Option<&str>) -> Result<Self> {
        let inner = PdsClient::from_refresh_token(refresh_jwt, pds.unwrap_or(DEFAULT_PDS)).await?;
        Ok(Self { inner })
    }

    /// Wrap an existing PDS client
    pub fn new(inner: PdsClient) -> Self {
        Self { inner }
    }

    /// Post text with up to [`MAX_IMAGES`] images
    ///
    /// Images are uploaded in order before the post is created. If any
    /// upload fails, no post is created.
    pub async fn post(&mut self, text: &str, images: Vec<ImageAttachment>) -> Result<Post> {
        if images.len() > MAX_IMAGES {
            return Err(Error::TooManyImages {
                count: images.len(),
                max: MAX_IMAGES,
            });
        }

        let mut uploaded = Vec::with_capacity(images.len());
        for image in images {
            let image_ref = self
                .inner
                .upload_image(image.data, &image.mime_type, image.alt)
                .await?;
            uploaded.push(image_ref);
        }

        let embed = (!uploaded.is_empty()).then(|| Embed::images(uploaded));
        let raw = self.inner.create_post(text, embed, None).await?;

        Ok(Post::new(raw, self.inner.session().handle()))
    }

    /// Current refresh JWT, for resuming later with [`Client::from_refresh_jwt`]
    pub fn refresh_jwt(&self) -> &str {
        self.inner.session().refresh_jwt()
    }

    /// Account handle
    pub fn handle(&self) -> &str {
        self.inner.session().handle()
    }

    /// Account DID
    pub fn did(&self) -> &str {
        self.inner.session().did()
    }

    /// PDS host
    pub fn pds(&self) -> &str {
        self.inner.pds()
    }

    /// Session details as a flat JSON object
    ///
    /// Optional values the server did not send are left out.
    pub fn user_info(&self) -> Map<String, Value> {
        let session = self.inner.session();
        let mut info = Map::new();

        info.insert("pds".into(), self.pds().into());
        info.insert("access_jwt".into(), session.access_jwt().into());
        info.insert("refresh_jwt".into(), session.refresh_jwt().into());
        info.insert("did".into(), session.did().into());

        let optional = [
            ("did_doc", session.did_doc().doc().cloned()),
            ("email", session.email().map(Value::from)),
            ("email_confirmed", session.email_confirmed().map(Value::from)),
            ("email_auth_factor", session.email_auth_factor().map(Value::from)),
            ("active", session.active().map(Value::from)),
            ("status", session.status().map(Value::from)),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                info.insert(key.into(), value);
            }
        }

        info
    }

    /// The underlying PDS client
    pub fn inner(&self) -> &PdsClient {
        &self.inner
    }

    /// The underlying PDS client, mutably
    pub fn inner_mut(&mut self) -> &mut PdsClient {
        &mut self.inner
    }
}
