//! Error types for the writer API.
//!
//! [`ApiError`] wraps everything a handler can fail with and converts into
//! an Axum response via its [`IntoResponse`] implementation. The body always
//! has the shape `{"ok": false, "error": <message>, "status": <code>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use continuum_core::{EngineError, TurnError};

/// Errors that can occur in the writer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The engine refused or failed the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A query parameter could not be parsed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The request body could not be parsed.
    #[error("invalid body: {0}")]
    InvalidBody(String),
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        Self::Engine(EngineError::Turn(err))
    }
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Engine(EngineError::Turn(turn)) => turn_status(turn),
            Self::Engine(EngineError::Store(_) | EngineError::State(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::InvalidQuery(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

const fn turn_status(err: &TurnError) -> StatusCode {
    match err {
        TurnError::NotRegistered | TurnError::NotYourTurn => StatusCode::FORBIDDEN,
        TurnError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
        TurnError::InvalidNickname
        | TurnError::AlreadyQueued
        | TurnError::NoActiveTurn
        | TurnError::TimeExpired
        | TurnError::EmptyText
        | TurnError::EntryTooLong { .. }
        | TurnError::DraftTooLong { .. } => StatusCode::BAD_REQUEST,
        TurnError::TurnTimingMissing | TurnError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            match &self {
                Self::Engine(EngineError::Turn(turn)) => turn.to_string(),
                _ => String::from("Internal error"),
            }
        } else {
            self.to_string()
        };

        let mut body = serde_json::json!({
            "ok": false,
            "error": message,
            "status": status.as_u16(),
        });
        if let Self::Engine(EngineError::Turn(TurnError::CooldownActive { remaining_seconds })) =
            &self
        {
            body["cooldown_seconds"] = serde_json::json!(remaining_seconds);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_errors_map_to_client_codes() {
        let cases = [
            (TurnError::NotRegistered, StatusCode::FORBIDDEN),
            (TurnError::NotYourTurn, StatusCode::FORBIDDEN),
            (
                TurnError::CooldownActive {
                    remaining_seconds: 3,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (TurnError::AlreadyQueued, StatusCode::BAD_REQUEST),
            (TurnError::TimeExpired, StatusCode::BAD_REQUEST),
            (TurnError::EmptyText, StatusCode::BAD_REQUEST),
            (TurnError::NoActiveTurn, StatusCode::BAD_REQUEST),
            (
                TurnError::TurnTimingMissing,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status(), code);
        }
    }

    #[test]
    fn bad_query_is_400() {
        assert_eq!(
            ApiError::InvalidQuery(String::from("limit")).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
