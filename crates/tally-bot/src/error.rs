//! Webhook error type and axum `IntoResponse` implementation.
//!
//! Only problems with the request itself surface here. Failures while
//! handling a well-formed update are answered to the user in chat and the
//! webhook still returns 200, otherwise Telegram would keep redelivering it.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
    }
  }
}
