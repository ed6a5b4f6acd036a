//! API response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Outcome tag carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Error,
}

/// Standard `{"message", "type"}` envelope, optionally extended with details.
#[derive(Debug, Serialize)]
pub struct ApiMessage<T: Serialize = ()> {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(flatten)]
    pub details: Option<T>,
}

impl ApiMessage {
    /// Create a success response.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: MessageKind::Success,
            details: None,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: MessageKind::Error,
            details: None,
        }
    }

    /// Attach extra fields, flattened next to `message` and `type`.
    pub fn with_details<T: Serialize>(self, details: T) -> ApiMessage<T> {
        ApiMessage {
            message: self.message,
            kind: self.kind,
            details: Some(details),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiMessage<T> {
    fn into_response(self) -> Response {
        let status = match self.kind {
            MessageKind::Success => StatusCode::OK,
            MessageKind::Error => StatusCode::BAD_REQUEST,
        };
        (status, Json(self)).into_response()
    }
}

/// Response for methods an endpoint does not accept.
pub async fn invalid_method() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiMessage::error("Invalid API Method")),
    )
        .into_response()
}
