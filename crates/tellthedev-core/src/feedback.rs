use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::credential::{Credential, CredentialKind};
use crate::environment::WidgetConfig;
use crate::transport::{MultipartField, RequestBody, WidgetRequest, WidgetResponse};

pub const MESSAGE_REQUIRED: &str = "Please enter a message";
pub const TYPE_REQUIRED: &str = "Please select a feedback type";
pub const NOT_INITIALIZED: &str = "Widget is not initialized. No project ID.";
pub const SERVER_FAILURE_FALLBACK: &str = "Something went wrong. Please try again.";
pub const TRANSPORT_FAILURE_FALLBACK: &str = "Submission failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Bug,
    Feature,
    Idea,
    General,
    Praise,
}

impl FeedbackType {
    pub const ALL: [Self; 5] = [
        Self::Bug,
        Self::Feature,
        Self::Idea,
        Self::General,
        Self::Praise,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Idea => "idea",
            Self::General => "general",
            Self::Praise => "praise",
        }
    }

    /// Parses a `data-type` attribute; anything outside the closed set is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Field-level validation messages; both may be set at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub message: Option<String>,
    pub feedback_type: Option<String>,
}

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.feedback_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub feedback_type: FeedbackType,
    pub message: String,
    pub image: Option<RawImage>,
}

/// Checks both fields independently and never short-circuits.
pub fn validate(message: &str, selected: Option<FeedbackType>) -> Result<FeedbackDraft, FieldErrors> {
    let message = message.trim();
    let mut errors = FieldErrors::default();
    if message.is_empty() {
        errors.message = Some(MESSAGE_REQUIRED.to_string());
    }
    if selected.is_none() {
        errors.feedback_type = Some(TYPE_REQUIRED.to_string());
    }
    match selected {
        Some(feedback_type) if errors.is_empty() => Ok(FeedbackDraft {
            feedback_type,
            message: message.to_string(),
            image: None,
        }),
        _ => Err(errors),
    }
}

impl FeedbackDraft {
    /// Project IDs post multipart form data; API keys post JSON with bearer auth.
    #[must_use]
    pub fn into_request(self, config: &WidgetConfig, credential: &Credential) -> WidgetRequest {
        let url = config.endpoint("submit-feedback");
        match credential.kind {
            CredentialKind::ProjectId => {
                let text = |name: &str, value: &str| MultipartField::Text {
                    name: name.to_string(),
                    value: value.to_string(),
                };
                let mut fields = vec![
                    text("projectId", &credential.value),
                    text("type", self.feedback_type.as_str()),
                    text("message", &self.message),
                ];
                if let Some(image) = self.image {
                    fields.push(MultipartField::File {
                        name: "image".to_string(),
                        image,
                    });
                }
                WidgetRequest::post(url, RequestBody::Multipart(fields))
            }
            CredentialKind::ApiKey => WidgetRequest::post(
                url,
                RequestBody::Json(json!({
                    "type": self.feedback_type.as_str(),
                    "content": self.message,
                })),
            )
            .with_bearer(credential.value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFailure {
    pub alert: String,
    pub content_error: Option<String>,
}

impl SubmitFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            alert: if message.trim().is_empty() {
                TRANSPORT_FAILURE_FALLBACK.to_string()
            } else {
                message
            },
            content_error: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<FailureData>,
}

#[derive(Debug, Default, Deserialize)]
struct FailureData {
    #[serde(default)]
    content: Option<String>,
}

/// Success needs an ok status and a JSON body; anything else is a failure.
pub fn interpret_response(response: &WidgetResponse) -> Result<Value, SubmitFailure> {
    if response.is_ok() {
        return serde_json::from_str(&response.body)
            .map_err(|error| SubmitFailure::transport(format!("invalid response body: {error}")));
    }
    let body: FailureBody = serde_json::from_str(&response.body).unwrap_or_default();
    let alert = body
        .error
        .filter(|text| !text.trim().is_empty())
        .or(body.message.filter(|text| !text.trim().is_empty()))
        .unwrap_or_else(|| SERVER_FAILURE_FALLBACK.to_string());
    Err(SubmitFailure {
        alert,
        content_error: body.data.and_then(|data| data.content),
    })
}
