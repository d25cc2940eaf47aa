use axum::{http::StatusCode, response::{IntoResponse, Redirect, Response}};
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with. No variant is fatal to the process;
/// each maps to a response for the current request.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),

  #[error("invalid username or password")]
  InvalidCredentials,

  #[error("username {0} is already taken")]
  DuplicateUsername(String),

  #[error("admin privileges required")]
  Forbidden,

  #[error("no such record")]
  NotFound,

  #[error("{0}")]
  InvalidFormat(String),

  #[error(transparent)]
  Database(#[from] sqlx::Error),

  #[error(transparent)]
  Hash(#[from] bcrypt::BcryptError),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      // The refused actor lands back on the read-only listing; the warning
      // notice was already placed in the session by the admin gate.
      AppError::Forbidden => Redirect::to("/").into_response(),
      AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
      AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
      AppError::Validation(_) | AppError::DuplicateUsername(_) | AppError::InvalidFormat(_) => {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
      }
      AppError::Multipart(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
      other => {
        error!("internal error: {}", other);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
      }
    }
  }
}
