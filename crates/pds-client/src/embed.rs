//! Post embeds
//!
//! Only the `app.bsky.embed.images` variant is modeled. Its images are blob
//! references returned by `uploadBlob`, each paired with alt text.

use serde::{Deserialize, Serialize};

/// An uploaded image ready to be embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Blob reference exactly as the server returned it
    pub image: serde_json::Value,
    /// Alt text
    #[serde(default)]
    pub alt: String,
}

impl ImageRef {
    /// Pair an uploaded blob with alt text
    pub fn new(image: serde_json::Value, alt: impl Into<String>) -> Self {
        Self {
            image,
            alt: alt.into(),
        }
    }
}

/// Embed attached to a post record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Embed {
    /// Images embed
    #[serde(rename = "app.bsky.embed.images")]
    Images {
        /// Uploaded images in display order
        images: Vec<ImageRef>,
    },
}

impl Embed {
    /// Wrap uploaded images into an images embed
    pub fn images(images: Vec<ImageRef>) -> Self {
        Embed::Images { images }
    }
}
