//! Credential extraction and the fail-closed bootstrap handshake.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::LOG_TARGET;
use crate::bridge::OriginPolicy;
use crate::environment::WidgetConfig;
use crate::transport::{RequestBody, WidgetRequest, WidgetTransport};

pub const API_KEY_ATTRIBUTE: &str = "data-api-key";
pub const PROJECT_ID_ATTRIBUTE: &str = "data-project-id";
pub const ALLOWED_ORIGINS_ATTRIBUTE: &str = "data-allowed-origins";
/// Set on the embedded document's script tag or root element.
pub const FRAME_MARKER_ATTRIBUTE: &str = "data-tellthedev-frame";

/// Which side of the bridge a loaded bundle runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetRole {
    Host,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    ApiKey,
    ProjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub kind: CredentialKind,
    pub value: String,
}

impl Credential {
    /// Blank values are treated as no credential at all.
    #[must_use]
    pub fn new(kind: CredentialKind, value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            value: value.to_string(),
        })
    }

    #[must_use]
    pub fn api_key(value: &str) -> Option<Self> {
        Self::new(CredentialKind::ApiKey, value)
    }

    #[must_use]
    pub fn project_id(value: &str) -> Option<Self> {
        Self::new(CredentialKind::ProjectId, value)
    }

    /// Request that checks this credential against the validation endpoint.
    #[must_use]
    pub fn validation_request(&self, config: &WidgetConfig) -> WidgetRequest {
        match self.kind {
            CredentialKind::ApiKey => {
                WidgetRequest::get(config.endpoint("bootstrap")).with_bearer(self.value.clone())
            }
            CredentialKind::ProjectId => WidgetRequest::post(
                config.endpoint("validate-project"),
                RequestBody::Json(json!({ "projectId": self.value })),
            ),
        }
    }
}

/// Attributes read once from the embedding `<script>` tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedAttributes {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub allowed_origins: Option<String>,
    pub frame_marker: bool,
}

impl EmbedAttributes {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: lookup(API_KEY_ATTRIBUTE),
            project_id: lookup(PROJECT_ID_ATTRIBUTE),
            allowed_origins: lookup(ALLOWED_ORIGINS_ATTRIBUTE),
            frame_marker: lookup(FRAME_MARKER_ATTRIBUTE).is_some(),
        }
    }

    /// Only a document that declares itself the widget frame binds the form;
    /// being framed or having a form is not enough.
    #[must_use]
    pub fn role(&self) -> WidgetRole {
        if self.frame_marker {
            WidgetRole::Frame
        } else {
            WidgetRole::Host
        }
    }

    /// An API key wins when a tag carries both attributes.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        let credential = self
            .api_key
            .as_deref()
            .and_then(Credential::api_key)
            .or_else(|| self.project_id.as_deref().and_then(Credential::project_id));
        if credential.is_none() {
            tracing::warn!(target: LOG_TARGET, "no API key or project ID provided");
        }
        credential
    }

    #[must_use]
    pub fn origin_policy(&self) -> OriginPolicy {
        self.allowed_origins
            .as_deref()
            .map_or(OriginPolicy::AcceptAll, OriginPolicy::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustVerdict {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ValidationBody {
    #[serde(default)]
    valid: Value,
    #[serde(default)]
    environment: Value,
    #[serde(default)]
    settings: Value,
}

/// Validates `credential`; every failure mode collapses to `None`.
pub async fn bootstrap<T>(
    transport: &T,
    config: &WidgetConfig,
    credential: &Credential,
) -> Option<TrustVerdict>
where
    T: WidgetTransport + ?Sized,
{
    let request = credential.validation_request(config);
    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(target: LOG_TARGET, %error, "bootstrap failed");
            return None;
        }
    };
    if !response.is_ok() {
        tracing::error!(target: LOG_TARGET, status = response.status, "bootstrap failed: HTTP {}", response.status);
        return None;
    }
    let body: ValidationBody = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(error) => {
            tracing::error!(target: LOG_TARGET, %error, "bootstrap response was not valid JSON");
            return None;
        }
    };
    if body.valid != Value::Bool(true) {
        tracing::warn!(target: LOG_TARGET, "credential rejected; widget not initialized");
        return None;
    }
    // Optional fields with an unexpected shape are dropped, not fatal.
    Some(TrustVerdict {
        valid: true,
        environment: body.environment.as_str().map(ToString::to_string),
        settings: match body.settings {
            Value::Object(settings) => Some(settings),
            _ => None,
        },
    })
}

/// Process-wide status published on the host page as `window.TellTheDev`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WidgetStatus {
    pub valid: bool,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
}

impl WidgetStatus {
    #[must_use]
    pub fn from_verdict(credential: Option<&Credential>, verdict: Option<&TrustVerdict>) -> Self {
        let Some(verdict) = verdict else {
            return Self::default();
        };
        let (api_key, project_id) = match credential {
            Some(Credential {
                kind: CredentialKind::ApiKey,
                value,
            }) => (Some(value.clone()), None),
            Some(Credential {
                kind: CredentialKind::ProjectId,
                value,
            }) => (None, Some(value.clone())),
            None => (None, None),
        };
        Self {
            valid: verdict.valid,
            api_key,
            project_id,
            environment: verdict.environment.clone(),
            settings: verdict.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::transport::{HttpMethod, TransportError, WidgetResponse};

    fn config() -> WidgetConfig {
        WidgetConfig::for_hostname("localhost")
    }

    #[test]
    fn api_key_attribute_takes_precedence() {
        let attributes = EmbedAttributes {
            api_key: Some(" key-1 ".to_string()),
            project_id: Some("project-1".to_string()),
            allowed_origins: None,
            frame_marker: false,
        };
        assert_eq!(attributes.credential(), Credential::api_key("key-1"));
    }

    #[test]
    fn blank_attributes_mean_no_credential() {
        let attributes = EmbedAttributes::from_lookup(|name| {
            (name == PROJECT_ID_ATTRIBUTE).then(|| "   ".to_string())
        });
        assert_eq!(attributes.credential(), None);
        assert_eq!(attributes.origin_policy(), OriginPolicy::AcceptAll);
    }

    #[test]
    fn only_marked_documents_run_as_frame() {
        let host = EmbedAttributes::from_lookup(|name| {
            (name == API_KEY_ATTRIBUTE).then(|| "abc123".to_string())
        });
        assert_eq!(host.role(), WidgetRole::Host);
        assert_eq!(EmbedAttributes::default().role(), WidgetRole::Host);

        let frame = EmbedAttributes::from_lookup(|name| {
            (name == FRAME_MARKER_ATTRIBUTE).then(String::new)
        });
        assert_eq!(frame.role(), WidgetRole::Frame);
        assert_eq!(frame.credential(), None);
    }

    #[test]
    fn validation_request_depends_on_credential_kind() {
        let api = Credential::api_key("abc123").expect("credential");
        let request = api.validation_request(&config());
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.url.ends_with("/bootstrap"));
        assert_eq!(request.bearer.as_deref(), Some("abc123"));

        let project = Credential::project_id("p-1").expect("credential");
        let request = project.validation_request(&config());
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("/validate-project"));
        assert_eq!(request.bearer, None);
        assert_eq!(request.body, RequestBody::Json(json!({ "projectId": "p-1" })));
    }

    #[tokio::test]
    async fn valid_response_produces_verdict() {
        let transport = FakeTransport::replying(WidgetResponse::new(
            200,
            r#"{"valid":true,"environment":"prod","settings":{"theme":"dark"}}"#,
        ));
        let credential = Credential::api_key("abc123").expect("credential");
        let verdict = bootstrap(&transport, &config(), &credential)
            .await
            .expect("verdict");
        assert!(verdict.valid);
        assert_eq!(verdict.environment.as_deref(), Some("prod"));
        assert_eq!(
            verdict.settings.and_then(|settings| settings.get("theme").cloned()),
            Some(json!("dark"))
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn every_failure_mode_converges_to_none() {
        let credential = Credential::project_id("p-1").expect("credential");
        let cases = [
            Ok(WidgetResponse::new(200, r#"{"valid":false}"#)),
            Ok(WidgetResponse::new(200, r#"{"valid":"true"}"#)),
            Ok(WidgetResponse::new(200, r#"{}"#)),
            Ok(WidgetResponse::new(500, r#"{"valid":true}"#)),
            Ok(WidgetResponse::new(200, "<html>")),
            Err(TransportError::Network("offline".to_string())),
        ];
        for case in cases {
            let transport = FakeTransport::with_result(case.clone());
            assert_eq!(
                bootstrap(&transport, &config(), &credential).await,
                None,
                "{case:?}"
            );
        }
    }

    #[tokio::test]
    async fn malformed_optional_fields_do_not_reject_valid_credential() {
        let transport = FakeTransport::replying(WidgetResponse::new(
            200,
            r#"{"valid":true,"environment":7,"settings":[]}"#,
        ));
        let credential = Credential::api_key("abc123").expect("credential");
        let verdict = bootstrap(&transport, &config(), &credential)
            .await
            .expect("verdict");
        assert!(verdict.valid);
        assert_eq!(verdict.environment, None);
        assert_eq!(verdict.settings, None);
    }

    #[test]
    fn status_reflects_credential_kind() {
        let verdict = TrustVerdict {
            valid: true,
            environment: Some("prod".to_string()),
            settings: None,
        };
        let credential = Credential::project_id("p-9");
        let status = WidgetStatus::from_verdict(credential.as_ref(), Some(&verdict));
        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(
            json,
            json!({ "valid": true, "projectId": "p-9", "environment": "prod" })
        );
        assert_eq!(
            serde_json::to_value(WidgetStatus::from_verdict(credential.as_ref(), None))
                .expect("serialize"),
            json!({ "valid": false })
        );
    }
}
