//! Response envelope and request-scoped errors.
//!
//! Every route answers with `{"error": bool, "msg": ...}`. Errors never carry
//! more detail than their fixed message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub use keyman_sdk::types::{Envelope, KeyRequest, KeysRequest, Message};

/// Errors a request can end in. All of them render as an error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("sorry, you are not authorized for this information")]
    AccessDenied,

    #[error("the key provided does not exist")]
    NotFound,

    #[error("the key provided for creation already exists")]
    Conflict,

    #[error("one or many character in the key provided make it invalid for creation; only numbers and letters are allowed")]
    InvalidKey,

    #[error("could not unmarshall JSON")]
    MalformedBody,

    #[error("could not find a handler for the provided request")]
    RouteNotFound,

    #[error("upstream request failed")]
    Upstream,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Upstream => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(Envelope::failure(self.to_string()))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
        ApiError::MalformedBody
    }
}
