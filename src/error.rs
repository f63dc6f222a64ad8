//! Error types shared by the upstream clients and the request handlers

use hyper::StatusCode;

/// Message returned to callers for every 500, upstream detail stays in the log
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process generation request";

/// Failure talking to a third-party API
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Model id that would not map onto a single model endpoint
    #[error("invalid model id: {0:?}")]
    InvalidModel(String),
}

/// Failure while validating or executing a dispatched action
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Missing or malformed request field
    #[error("{0}")]
    Validation(String),

    #[error("Unknown action")]
    UnknownAction(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnknownAction(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(_) | Self::UnknownAction(_) => self.to_string(),
            Self::Upstream(_) | Self::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
