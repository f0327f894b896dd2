// crates/relay/src/error.rs
//! Error types for the relay server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Result type for relay setup and serving
pub type RelayResult<T> = Result<T, RelayError>;

/// Failures starting or running the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Could not build the upstream HTTP client
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    /// Could not bind the listening socket
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server loop failed
    #[error("Relay server error: {0}")]
    Serve(std::io::Error),
}

pub(crate) const NO_RESPONSE: &str = "No response received from upstream completion API.";
pub(crate) const SETUP_FAILED: &str = "Failed to setup upstream completion request.";

/// Outcome of a failed chat relay call, rendered as `{ "error": ... }`
#[derive(Debug)]
pub enum ChatError {
    /// Upstream answered with a non-success status; relayed unchanged
    Upstream { status: StatusCode, body: Value },

    /// Request was sent but nothing usable came back
    NoResponse,

    /// The request could not be built locally
    Setup,
}

impl ChatError {
    /// Classifies a transport failure from the upstream client
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            ChatError::Setup
        } else {
            ChatError::NoResponse
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::Upstream { status, .. } => *status,
            ChatError::NoResponse | ChatError::Setup => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ChatError::Upstream { body, .. } => body,
            ChatError::NoResponse => Value::String(NO_RESPONSE.to_string()),
            ChatError::Setup => Value::String(SETUP_FAILED.to_string()),
        };
        (status, Json(json!({ "error": error }))).into_response()
    }
}
