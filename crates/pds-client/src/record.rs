//! Post record assembly
//!
//! Optional keys are left out of the JSON entirely rather than sent as empty
//! or null values; the repository treats "no embed" and "null embed"
//! differently.

use crate::embed::Embed;
use crate::richtext::{extract_facets, Facet};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Collection NSID for posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// An `app.bsky.feed.post` record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    /// Record type
    #[serde(rename = "$type")]
    pub record_type: &'static str,
    /// Post text
    pub text: String,
    /// Creation timestamp (RFC 3339, UTC, millisecond precision)
    pub created_at: String,
    /// Rich text facets
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    /// Attached embed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl PostRecord {
    /// Build a post record, detecting link facets in `text`
    ///
    /// `created_at` defaults to the current time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pds_client::record::PostRecord;
    ///
    /// let record = PostRecord::build("hello", None, None);
    /// let json = serde_json::to_value(&record).unwrap();
    /// assert!(json.get("facets").is_none());
    /// assert!(json.get("embed").is_none());
    /// ```
    pub fn build(
        text: impl Into<String>,
        embed: Option<Embed>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        let text = text.into();
        let facets = extract_facets(&text);
        let created_at = format_timestamp(created_at.unwrap_or_else(Utc::now));

        Self {
            record_type: POST_COLLECTION,
            text,
            created_at,
            facets,
            embed,
        }
    }
}

/// Format a timestamp the way the protocol's datetime format expects
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Body of a `com.atproto.repo.createRecord` call
#[derive(Debug, Clone, Serialize)]
pub struct CreateRecordRequest<'a> {
    /// Repository (handle or DID)
    pub repo: &'a str,
    /// Collection NSID
    pub collection: &'a str,
    /// Record value
    pub record: &'a PostRecord,
}

impl<'a> CreateRecordRequest<'a> {
    /// Request creating `record` in the post collection of `repo`
    pub fn post(repo: &'a str, record: &'a PostRecord) -> Self {
        Self {
            repo,
            collection: POST_COLLECTION,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::ImageRef;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-02T03:04:05.678Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_record_without_links_or_embed() {
        let record = PostRecord::build("plain text", None, Some(fixed_time()));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            json!({
                "$type": "app.bsky.feed.post",
                "text": "plain text",
                "createdAt": "2024-01-02T03:04:05.678Z"
            })
        );
    }

    #[test]
    fn test_record_with_link_facets() {
        let record = PostRecord::build("go to https://example.com", None, Some(fixed_time()));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json["facets"],
            json!([{
                "index": {"byteStart": 6, "byteEnd": 25},
                "features": [{"$type": "app.bsky.richtext.facet#link", "uri": "https://example.com"}]
            }])
        );
        assert!(json.get("embed").is_none());
    }

    #[test]
    fn test_record_with_embed() {
        let blob = json!({"$type": "blob", "ref": {"$link": "bafkrei"}, "mimeType": "image/jpeg", "size": 3});
        let embed = Embed::images(vec![ImageRef::new(blob.clone(), "")]);
        let record = PostRecord::build("pic", Some(embed), Some(fixed_time()));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json["embed"],
            json!({
                "$type": "app.bsky.embed.images",
                "images": [{"image": blob, "alt": ""}]
            })
        );
        assert!(json.get("facets").is_none());
    }

    #[test]
    fn test_record_default_timestamp() {
        let before = Utc::now();
        let record = PostRecord::build("now", None, None);
        let after = Utc::now();

        assert!(record.created_at.ends_with('Z'));
        let parsed = DateTime::parse_from_rfc3339(&record.created_at)
            .unwrap()
            .with_timezone(&Utc);
        assert!(parsed >= before - chrono::Duration::milliseconds(1));
        assert!(parsed <= after);
    }

    #[test]
    fn test_create_record_request() {
        let record = PostRecord::build("hi", None, Some(fixed_time()));
        let request = CreateRecordRequest::post("alice.bsky.social", &record);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["repo"], "alice.bsky.social");
        assert_eq!(json["collection"], "app.bsky.feed.post");
        assert_eq!(json["record"]["text"], "hi");
    }
}
