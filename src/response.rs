//! Response helpers. Storage results are returned verbatim as JSON; writes
//! answer with an empty body, deletes with no content.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub fn json_ok<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(payload)).into_response()
}

pub fn empty_ok() -> Response {
    StatusCode::OK.into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
