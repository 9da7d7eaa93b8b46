use crate::signaling::AuthError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lectern_core::RoomId;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    /// No credential was presented.
    #[error("Missing credential")]
    MissingCredential,

    /// The auth collaborator refused the credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// The room's coordinator is draining or already gone.
    #[error("Room {0} is closed")]
    RoomClosed(RoomId),
}

impl SignalingError {
    /// Short machine-readable code, also used in `error` frames.
    pub fn code(&self) -> &'static str {
        match self {
            SignalingError::MissingCredential | SignalingError::Unauthorized(_) => "unauthorized",
            SignalingError::RoomClosed(_) => "room_closed",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            SignalingError::MissingCredential | SignalingError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            SignalingError::RoomClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for SignalingError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
