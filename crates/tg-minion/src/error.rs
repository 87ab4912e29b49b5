//! Reused verbatim in shape from `tg-controller::error` (itself ported from
//! `vinit::vcontrol::error`): an `anyhow` newtype any fallible HTTP handler
//! can `?`-propagate into.

use std::fmt::{Display, Formatter};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct Error(anyhow::Error);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let msg = self.0.to_string();
        error!("request failed: {}", msg);
        let body = Json(json!({ "error": msg }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<T> From<T> for Error
where
    T: Into<anyhow::Error>,
{
    fn from(t: T) -> Self {
        Error(t.into())
    }
}

pub type AppResult<T> = Result<T, Error>;
