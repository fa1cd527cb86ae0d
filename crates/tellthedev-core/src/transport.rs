use async_trait::async_trait;
use serde_json::Value;

use crate::feedback::RawImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MultipartField {
    Text { name: String, value: String },
    File { name: String, image: RawImage },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<MultipartField>),
}

/// A fully planned request; transports only move bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetRequest {
    pub method: HttpMethod,
    pub url: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl WidgetRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            bearer: None,
            body,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetResponse {
    pub status: u16,
    pub body: String,
}

impl WidgetResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),
    #[error("failed to build request: {0}")]
    Build(String),
    #[error("failed to read response: {0}")]
    Read(String),
}

/// `?Send` because browser futures are bound to the page's single thread.
#[async_trait(?Send)]
pub trait WidgetTransport {
    async fn send(&self, request: WidgetRequest) -> Result<WidgetResponse, TransportError>;
}
