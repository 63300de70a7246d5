//! Inbound tagged message types.
//!
//! The Puppet service streams results back as tagged envelopes: a `type`
//! discriminant plus a tag-dependent `data` field. The sender is trusted, so
//! unwrapping is a direct field read with no validation; tags outside the
//! known set are carried through as [`ParsedMessage::Unknown`] and dropped by
//! the dispatcher without error.
//!
//! # Message Tags
//!
//! | Tag | Payload |
//! |------------|------------------------------------------|
//! | `tracker` | [`Tracker`] fields |
//! | `screenshot` | bare string (image URI or raw data) |
//! | `error` | opaque, forwarded verbatim to the caller |
//! | `close` | opaque, forwarded verbatim to the caller |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Tag
// ============================================================================

/// The closed set of known message tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// A tracker detected on the rendered page.
    Tracker,
    /// A captured screenshot.
    Screenshot,
    /// A protocol-level error report.
    Error,
    /// Remote end is closing the session.
    Close,
}

impl Tag {
    /// Returns the wire representation of this tag.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "tracker",
            Self::Screenshot => "screenshot",
            Self::Error => "error",
            Self::Close => "close",
        }
    }
}

// ============================================================================
// PuppetMessage
// ============================================================================

/// A tagged message envelope exchanged with the Puppet service.
///
/// # Format
///
/// ```json
/// {
///   "type": "tracker",
///   "data": { ... }
/// }
/// ```
///
/// The `tag` field is kept as a plain string so envelopes with tags outside
/// the known set still deserialize; [`parse`](Self::parse) maps them to
/// [`ParsedMessage::Unknown`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuppetMessage {
    /// Discriminant selecting the shape of `data`.
    #[serde(rename = "type")]
    pub tag: String,

    /// Tag-dependent payload.
    pub data: Value,
}

// ============================================================================
// Wrap Constructors
// ============================================================================

impl PuppetMessage {
    /// Wraps an arbitrary payload under a known tag.
    #[inline]
    #[must_use]
    pub fn wrap(tag: Tag, data: Value) -> Self {
        Self {
            tag: tag.as_str().to_string(),
            data,
        }
    }

    /// Builds a `tracker` message from raw tracker fields.
    ///
    /// The fields are routed through [`Tracker`] so callers passing raw
    /// strings get the canonical wire shape back.
    #[must_use]
    pub fn tracker(
        name: impl Into<String>,
        base_url: impl Into<String>,
        category: TrackerCategory,
    ) -> Self {
        let tracker = Tracker {
            name: name.into(),
            base_url: base_url.into(),
            category,
        };

        Self::wrap(
            Tag::Tracker,
            serde_json::to_value(&tracker).expect("tracker serialization is infallible"),
        )
    }

    /// Builds a `screenshot` message from raw image data.
    ///
    /// Only the data string goes over the wire; the client-side `loaded`
    /// flag of [`Screenshot`](crate::Screenshot) is never transmitted.
    #[inline]
    #[must_use]
    pub fn screenshot(data: impl Into<String>) -> Self {
        Self::wrap(Tag::Screenshot, Value::String(data.into()))
    }
}

// ============================================================================
// Unwrap / Parse
// ============================================================================

impl PuppetMessage {
    /// Parses the envelope into a typed variant.
    ///
    /// Tags outside the known set, and known tags whose `data` does not have
    /// the expected shape, come back as [`ParsedMessage::Unknown`].
    #[must_use]
    pub fn parse(&self) -> ParsedMessage {
        match self.tag.as_str() {
            "tracker" => match serde_json::from_value::<Tracker>(self.data.clone()) {
                Ok(tracker) => ParsedMessage::Tracker(tracker),
                Err(_) => self.unknown(),
            },

            "screenshot" => ParsedMessage::Screenshot(
                self.data.as_str().unwrap_or_default().to_string(),
            ),

            // Error and close payloads are implementation-defined; they are
            // forwarded verbatim for the caller's handler to interpret.
            "error" => ParsedMessage::Error(self.data.clone()),
            "close" => ParsedMessage::Close(self.data.clone()),

            _ => self.unknown(),
        }
    }

    /// Builds the `Unknown` fallback carrying the raw envelope fields.
    fn unknown(&self) -> ParsedMessage {
        ParsedMessage::Unknown {
            tag: self.tag.clone(),
            data: self.data.clone(),
        }
    }
}

// ============================================================================
// ParsedMessage
// ============================================================================

/// Parsed message variants for type-safe handling.
///
/// This is the closed sum the dispatcher matches on exhaustively; the
/// `Unknown` variant carries everything outside the four known tags so
/// unrecognized messages flow through without errors.
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    /// A tracker detected on the rendered page.
    Tracker(Tracker),

    /// Captured screenshot data (image URI or raw data).
    Screenshot(String),

    /// Protocol-level error payload, not interpreted by the client.
    Error(Value),

    /// Session close payload, not interpreted by the client.
    Close(Value),

    /// Unrecognized tag or malformed payload.
    Unknown {
        /// The raw tag string.
        tag: String,
        /// The raw payload.
        data: Value,
    },
}

// ============================================================================
// Tracker
// ============================================================================

/// A detected third-party script/resource with a privacy category.
///
/// Immutable value; the three category constants are the complete set the
/// service emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    /// Human-readable tracker name.
    pub name: String,

    /// Origin URL of the tracker.
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// Privacy category.
    pub category: TrackerCategory,
}

// ============================================================================
// TrackerCategory
// ============================================================================

/// Privacy category of a detected tracker.
///
/// Serialized with the exact wire constants (`"FingerprintingGeneral"`,
/// `"Advertising"`, `"Content"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerCategory {
    /// General fingerprinting scripts.
    FingerprintingGeneral,
    /// Advertising networks.
    Advertising,
    /// Third-party content embeds.
    Content,
}

impl TrackerCategory {
    /// All known categories, in wire order.
    pub const ALL: [Self; 3] = [Self::FingerprintingGeneral, Self::Advertising, Self::Content];

    /// Returns the wire representation of this category.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FingerprintingGeneral => "FingerprintingGeneral",
            Self::Advertising => "Advertising",
            Self::Content => "Content",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_tracker_message_round_trip() {
        let message = PuppetMessage::tracker(
            "Google Analytics",
            "https://www.google-analytics.com",
            TrackerCategory::Advertising,
        );

        assert_eq!(message.tag, "tracker");

        match message.parse() {
            ParsedMessage::Tracker(tracker) => {
                assert_eq!(tracker.name, "Google Analytics");
                assert_eq!(tracker.base_url, "https://www.google-analytics.com");
                assert_eq!(tracker.category, TrackerCategory::Advertising);
            }
            other => panic!("unexpected parsed message: {other:?}"),
        }
    }

    #[test]
    fn test_tracker_wire_format() {
        let message = PuppetMessage::tracker(
            "FingerprintJS",
            "https://fpjs.io",
            TrackerCategory::FingerprintingGeneral,
        );
        let json = serde_json::to_string(&message).expect("serialize");

        assert!(json.contains(r#""type":"tracker""#));
        assert!(json.contains(r#""baseUrl":"https://fpjs.io""#));
        assert!(json.contains(r#""category":"FingerprintingGeneral""#));
    }

    #[test]
    fn test_screenshot_wire_format_has_no_loaded_flag() {
        let message = PuppetMessage::screenshot("data:image/jpeg;base64,AAAA");
        let json = serde_json::to_string(&message).expect("serialize");

        assert_eq!(json, r#"{"type":"screenshot","data":"data:image/jpeg;base64,AAAA"}"#);
        assert!(!json.contains("loaded"));
    }

    #[test]
    fn test_screenshot_parse() {
        let json_str = r#"{"type":"screenshot","data":"data:image/png;base64,iVBORw0K"}"#;
        let message: PuppetMessage = serde_json::from_str(json_str).expect("parse envelope");

        match message.parse() {
            ParsedMessage::Screenshot(data) => {
                assert_eq!(data, "data:image/png;base64,iVBORw0K");
            }
            other => panic!("unexpected parsed message: {other:?}"),
        }
    }

    #[test]
    fn test_error_payload_is_opaque() {
        let json_str = r#"{"type":"error","data":{"code":500,"reason":"render failed"}}"#;
        let message: PuppetMessage = serde_json::from_str(json_str).expect("parse envelope");

        match message.parse() {
            ParsedMessage::Error(data) => {
                assert_eq!(data.get("code").and_then(Value::as_u64), Some(500));
            }
            other => panic!("unexpected parsed message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let json_str = r#"{"type":"foo","data":{"anything":true}}"#;
        let message: PuppetMessage = serde_json::from_str(json_str).expect("parse envelope");

        match message.parse() {
            ParsedMessage::Unknown { tag, .. } => assert_eq!(tag, "foo"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_tracker_payload_falls_back_to_unknown() {
        let json_str = r#"{"type":"tracker","data":"not an object"}"#;
        let message: PuppetMessage = serde_json::from_str(json_str).expect("parse envelope");

        assert!(matches!(message.parse(), ParsedMessage::Unknown { .. }));
    }

    #[test]
    fn test_tag_as_str() {
        assert_eq!(Tag::Tracker.as_str(), "tracker");
        assert_eq!(Tag::Screenshot.as_str(), "screenshot");
        assert_eq!(Tag::Error.as_str(), "error");
        assert_eq!(Tag::Close.as_str(), "close");
    }

    proptest! {
        /// Any (name, base_url, category) triple survives wrap -> parse.
        #[test]
        fn prop_tracker_round_trips(
            name in ".{0,64}",
            base_url in "https?://[a-z0-9.]{1,40}",
            index in 0usize..3,
        ) {
            let category = TrackerCategory::ALL[index];
            let message = PuppetMessage::tracker(name.clone(), base_url.clone(), category);

            prop_assert_eq!(&message.tag, "tracker");
            match message.parse() {
                ParsedMessage::Tracker(tracker) => {
                    prop_assert_eq!(tracker.name, name);
                    prop_assert_eq!(tracker.base_url, base_url);
                    prop_assert_eq!(tracker.category, category);
                }
                other => prop_assert!(false, "unexpected parsed message: {:?}", other),
            }
        }

        /// The screenshot wire payload is exactly the data string.
        #[test]
        fn prop_screenshot_payload_is_bare_data(data in ".{0,128}") {
            let message = PuppetMessage::screenshot(data.clone());
            let value = serde_json::to_value(&message).expect("serialize");

            prop_assert_eq!(value.get("type").and_then(Value::as_str), Some("screenshot"));
            prop_assert_eq!(
                value.get("data").and_then(Value::as_str),
                Some(data.as_str())
            );
            prop_assert!(value.get("loaded").is_none());
        }
    }
}
