//! Cross-frame message protocol between the host page and the widget frame.
//!
//! Messages are plain objects tagged by `type`. Nothing is acknowledged and
//! the outbound target origin is `"*"`; inbound filtering is left to
//! [`OriginPolicy`], which accepts every sender unless the embedder opts in.

use serde_json::{Value, json};

use crate::credential::{Credential, CredentialKind};

pub const INIT_MESSAGE_TYPE: &str = "tellthedev:init";
pub const RESIZE_MESSAGE_TYPE: &str = "tellthedev:resize";
pub const TARGET_ORIGIN_ANY: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge payload is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Height exactly as the frame sent it; rendered without bounds checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeHeight(pub Value);

impl ResizeHeight {
    #[must_use]
    pub fn pixels(height: u32) -> Self {
        Self(Value::from(height))
    }

    /// Rounds a measured layout height up to whole pixels.
    #[must_use]
    pub fn from_layout(height: f64) -> Self {
        let pixels = if height.is_finite() && height > 0.0 {
            height.ceil().min(f64::from(u32::MAX)) as u32
        } else {
            0
        };
        Self::pixels(pixels)
    }

    #[must_use]
    pub fn css_value(&self) -> String {
        match &self.0 {
            Value::String(raw) => format!("{raw}px"),
            other => format!("{other}px"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    Init(Credential),
    Resize(ResizeHeight),
}

impl BridgeMessage {
    /// Returns `Ok(None)` for messages that are not part of the protocol.
    pub fn decode(raw: &str) -> Result<Option<Self>, BridgeError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(&value))
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        match object.get("type").and_then(Value::as_str)? {
            INIT_MESSAGE_TYPE => {
                let field = |name: &str| object.get(name).and_then(Value::as_str);
                field("apiKey")
                    .and_then(Credential::api_key)
                    .or_else(|| field("projectId").and_then(Credential::project_id))
                    .map(Self::Init)
            }
            RESIZE_MESSAGE_TYPE => object
                .get("height")
                .cloned()
                .map(|height| Self::Resize(ResizeHeight(height))),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Init(credential) => {
                let field = match credential.kind {
                    CredentialKind::ApiKey => "apiKey",
                    CredentialKind::ProjectId => "projectId",
                };
                json!({ "type": INIT_MESSAGE_TYPE, field: credential.value })
            }
            Self::Resize(height) => json!({ "type": RESIZE_MESSAGE_TYPE, "height": height.0 }),
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    AcceptAll,
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Parses a comma-separated origin list; an empty list accepts all.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let origins = raw
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_ascii_lowercase())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();
        if origins.is_empty() {
            Self::AcceptAll
        } else {
            Self::AllowList(origins)
        }
    }

    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::AllowList(origins) => {
                let origin = origin.trim_end_matches('/').to_ascii_lowercase();
                origins.iter().any(|allowed| *allowed == origin)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_init_with_either_credential_field() {
        let api = BridgeMessage::decode(r#"{"type":"tellthedev:init","apiKey":"k-1"}"#)
            .expect("json");
        assert_eq!(api, Credential::api_key("k-1").map(BridgeMessage::Init));

        let project =
            BridgeMessage::from_value(&json!({ "type": INIT_MESSAGE_TYPE, "projectId": "p-1" }));
        assert_eq!(project, Credential::project_id("p-1").map(BridgeMessage::Init));
    }

    #[test]
    fn init_without_credential_is_ignored() {
        assert_eq!(
            BridgeMessage::from_value(&json!({ "type": INIT_MESSAGE_TYPE, "apiKey": "" })),
            None
        );
        assert_eq!(BridgeMessage::from_value(&json!({ "type": INIT_MESSAGE_TYPE })), None);
    }

    #[test]
    fn unrelated_messages_are_ignored() {
        assert_eq!(BridgeMessage::from_value(&json!({ "type": "other" })), None);
        assert_eq!(BridgeMessage::from_value(&json!("tellthedev:init")), None);
        assert_eq!(BridgeMessage::from_value(&json!({ "height": 10 })), None);
        assert!(BridgeMessage::decode("not json").is_err());
    }

    #[test]
    fn resize_height_passes_through_unvalidated() {
        let message = BridgeMessage::from_value(&json!({ "type": RESIZE_MESSAGE_TYPE, "height": 480 }));
        let Some(BridgeMessage::Resize(height)) = message else {
            panic!("expected resize, got {message:?}");
        };
        assert_eq!(height.css_value(), "480px");

        assert_eq!(ResizeHeight(json!(-20)).css_value(), "-20px");
        assert_eq!(ResizeHeight(json!(12.5)).css_value(), "12.5px");
        assert_eq!(ResizeHeight(json!("9999")).css_value(), "9999px");
    }

    #[test]
    fn measured_height_tracks_content_in_both_directions() {
        assert_eq!(ResizeHeight::from_layout(612.2).css_value(), "613px");
        assert_eq!(ResizeHeight::from_layout(240.0).css_value(), "240px");
        assert_eq!(ResizeHeight::from_layout(-3.0), ResizeHeight::pixels(0));
        assert_eq!(ResizeHeight::from_layout(f64::NAN), ResizeHeight::pixels(0));
    }

    #[test]
    fn encoded_messages_decode_to_themselves() {
        let init = Credential::project_id("p-2").map(BridgeMessage::Init).expect("credential");
        assert_eq!(
            init.to_value(),
            json!({ "type": "tellthedev:init", "projectId": "p-2" })
        );
        let resize = BridgeMessage::Resize(ResizeHeight::pixels(320));
        assert_eq!(
            BridgeMessage::decode(&resize.encode()).expect("json"),
            Some(resize)
        );
    }

    #[test]
    fn origin_allow_list_matches_normalized_origins() {
        let policy = OriginPolicy::parse(" https://Shop.example.com/ , http://localhost:3000");
        assert!(policy.allows("https://shop.example.com"));
        assert!(policy.allows("http://localhost:3000"));
        assert!(!policy.allows("https://evil.example.com"));
        assert_eq!(OriginPolicy::parse(" , "), OriginPolicy::AcceptAll);
        assert!(OriginPolicy::AcceptAll.allows("null"));
    }
}
