//! Uniform `{status, result}` response envelope.

use crate::error::ApiError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    pub result: T,
}

/// Successful envelope with the given status code.
pub fn ok<T: Serialize>(status: StatusCode, result: T) -> Response {
    (status, Json(Envelope { status: "ok", result })).into_response()
}

/// `{status: "ok", result: ""}`.
pub fn ok_empty() -> Response {
    ok(StatusCode::OK, "")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.code.is_server_error() {
            error!(code = ?self.code, details = ?self.details, "request failed");
        }

        let body = Envelope {
            status: "error",
            result: self.message,
        };
        (status, Json(body)).into_response()
    }
}
