//! Rich text facets
//!
//! Facets annotate byte ranges of post text. Offsets are UTF-8 byte
//! positions into the original text, which is what the
//! `app.bsky.richtext.facet` lexicon specifies.
//!
//! Only `http`/`https` links are detected. Mentions are not extracted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Byte range index for facet positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    /// Start position in UTF-8 bytes (inclusive)
    pub byte_start: usize,
    /// End position in UTF-8 bytes (exclusive)
    pub byte_end: usize,
}

/// Link feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// URI of the link
    pub uri: String,
}

/// Facet feature types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    /// Link feature
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link(Link),
}

/// A facet represents a span of text with special meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    /// Byte range of the facet in the text
    pub index: ByteSlice,
    /// Features associated with this facet
    pub features: Vec<FacetFeature>,
}

impl Facet {
    /// Create a link facet over `byte_start..byte_end`
    pub fn link(byte_start: usize, byte_end: usize, uri: impl Into<String>) -> Self {
        Self {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![FacetFeature::Link(Link { uri: uri.into() })],
        }
    }
}

fn link_regex() -> &'static Regex {
    static LINK_REGEX: OnceLock<Regex> = OnceLock::new();
    LINK_REGEX.get_or_init(|| {
        // Scheme plus a run of RFC 3986 URI characters
        Regex::new(r"https?://[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+")
            .expect("link pattern is valid")
    })
}

/// Extract link facets from post text
///
/// Matches are found in a single left-to-right scan, so they come out in
/// order of occurrence and never overlap. Each facet's URI is the matched
/// text verbatim.
///
/// # Example
///
/// ```rust
/// use pds_client::richtext::extract_facets;
///
/// let facets = extract_facets("see https://example.com/x");
/// assert_eq!(facets.len(), 1);
/// assert_eq!(facets[0].index.byte_start, 4);
/// assert_eq!(facets[0].index.byte_end, 25);
/// ```
pub fn extract_facets(text: &str) -> Vec<Facet> {
    link_regex()
        .find_iter(text)
        .map(|m| Facet::link(m.start(), m.end(), m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_uri(facet: &Facet) -> &str {
        match &facet.features[0] {
            FacetFeature::Link(link) => &link.uri,
        }
    }

    #[test]
    fn test_two_links_in_order() {
        let text = "see https://example.com/x and http://a.b";
        let facets = extract_facets(text);

        assert_eq!(facets.len(), 2);

        assert_eq!(facets[0].index, ByteSlice { byte_start: 4, byte_end: 25 });
        assert_eq!(link_uri(&facets[0]), "https://example.com/x");
        assert_eq!(&text[4..25], "https://example.com/x");

        assert_eq!(facets[1].index, ByteSlice { byte_start: 30, byte_end: 40 });
        assert_eq!(link_uri(&facets[1]), "http://a.b");
        assert_eq!(&text[30..40], "http://a.b");
    }

    #[test]
    fn test_no_links() {
        assert!(extract_facets("just some words, no links").is_empty());
        assert!(extract_facets("").is_empty());
        assert!(extract_facets("ftp://example.com and example.com").is_empty());
    }

    #[test]
    fn test_offsets_are_utf8_bytes() {
        let text = "héllo ✨ https://example.com 日本";
        let facets = extract_facets(text);

        assert_eq!(facets.len(), 1);
        let ByteSlice { byte_start, byte_end } = facets[0].index;

        // "héllo " is 7 bytes, "✨ " is 4 more
        assert_eq!(byte_start, 11);
        assert_eq!(byte_end, 30);
        assert_eq!(&text[byte_start..byte_end], "https://example.com");
    }

    #[test]
    fn test_link_stops_at_non_uri_characters() {
        let text = "(https://example.com/a?b=c#d) \"http://x.y/z\"";
        let uris: Vec<_> = extract_facets(text)
            .iter()
            .map(|f| link_uri(f).to_string())
            .collect();

        assert_eq!(uris, vec!["https://example.com/a?b=c#d)", "http://x.y/z"]);
    }

    #[test]
    fn test_trailing_sentence_punctuation_is_kept() {
        let text = "see https://example.com. or http://a.b/c, then stop";
        let facets = extract_facets(text);

        assert_eq!(link_uri(&facets[0]), "https://example.com.");
        assert_eq!(facets[0].index, ByteSlice { byte_start: 4, byte_end: 24 });
        assert_eq!(link_uri(&facets[1]), "http://a.b/c,");
        assert_eq!(facets[1].index, ByteSlice { byte_start: 28, byte_end: 41 });
    }

    #[test]
    fn test_facets_do_not_overlap() {
        let text = "https://a.com/https://b.com http://c.com";
        let facets = extract_facets(text);

        for pair in facets.windows(2) {
            assert!(pair[0].index.byte_end <= pair[1].index.byte_start);
        }
        assert_eq!(facets.len(), 2);
        assert_eq!(link_uri(&facets[0]), "https://a.com/https://b.com");
    }

    #[test]
    fn test_mentions_are_not_extracted() {
        assert!(extract_facets("hello @alice.bsky.social").is_empty());
    }

    #[test]
    fn test_facet_serialization() {
        let facet = Facet::link(0, 10, "http://a.b");
        let json = serde_json::to_value(&facet).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "index": {"byteStart": 0, "byteEnd": 10},
                "features": [{"$type": "app.bsky.richtext.facet#link", "uri": "http://a.b"}]
            })
        );
    }
}
