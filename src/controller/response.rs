// Shared response helpers for the operator API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::governor::Error;

pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Error body returned by every operator endpoint.
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    message: String,
}

/// HTTP status for a governor error.
pub fn status_of(err: &Error) -> StatusCode {
    match err {
        Error::UnknownUnit(_) | Error::NotAttached(_) => StatusCode::NOT_FOUND,
        Error::NotManaged(_) | Error::AlreadyAttached(_) => StatusCode::CONFLICT,
        Error::InvalidFrequency { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::PreconditionViolation(_) => StatusCode::PRECONDITION_FAILED,
        Error::Driver { .. } | Error::OutOfMemory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &Error) -> Response {
    json_response(
        status_of(err),
        &ErrorResponse {
            error: err.kind(),
            message: err.to_string(),
        },
    )
}

pub fn bad_request(message: &str) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        &ErrorResponse {
            error: "bad_request",
            message: message.to_string(),
        },
    )
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (
        status,
        [("content-type", CONTENT_TYPE_JSON)],
        serde_json::to_string(body).unwrap_or_default(),
    )
        .into_response()
}

/// Frequency in the sysfs text format: decimal kHz and a newline.
pub fn khz_response(freq: u32) -> Response {
    (
        StatusCode::OK,
        [("content-type", CONTENT_TYPE_TEXT)],
        format!("{freq}\n"),
    )
        .into_response()
}
