use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0}")]
  InvalidArgs(String),
  #[error("invalid activation code")]
  InvalidCode,
  #[error("activation code has already been used")]
  CodeAlreadyUsed,
  #[error("activation code is disabled")]
  CodeDisabled,
  #[error("activation code has expired")]
  CodeExpired,
  #[error("user already has an active lifetime subscription")]
  AlreadyPro,
  #[error("user not found or not a pro user")]
  UserNotFound,
  #[error(transparent)]
  Db(#[from] sea_orm::DbErr),
  #[error("{0}")]
  Internal(String),
}

impl Error {
  /// Stable machine-readable code, so clients can branch without
  /// matching on message strings.
  pub fn code(&self) -> &'static str {
    match self {
      Error::InvalidArgs(_) => "VALIDATION_ERROR",
      Error::InvalidCode => "INVALID_CODE",
      Error::CodeAlreadyUsed => "CODE_ALREADY_USED",
      Error::CodeDisabled => "CODE_DISABLED",
      Error::CodeExpired => "CODE_EXPIRED",
      Error::AlreadyPro => "ALREADY_PRO",
      Error::UserNotFound => "USER_NOT_FOUND",
      Error::Db(_) => "STORE_UNAVAILABLE",
      Error::Internal(_) => "INTERNAL_ERROR",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::InvalidArgs(_)
      | Error::InvalidCode
      | Error::CodeAlreadyUsed
      | Error::CodeDisabled
      | Error::CodeExpired
      | Error::AlreadyPro => StatusCode::BAD_REQUEST,
      Error::UserNotFound => StatusCode::NOT_FOUND,
      Error::Db(_) => StatusCode::SERVICE_UNAVAILABLE,
      Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

#[derive(Serialize)]
struct ErrorBody {
  success: bool,
  error: String,
  code: &'static str,
}

impl IntoResponse for Error {
  fn into_response(self) -> axum::response::Response {
    let message = match &self {
      // Infrastructure failures are logged with detail but surfaced
      // to the caller as a generic message.
      Error::Db(err) => {
        tracing::error!("store error: {err}");
        "store unavailable".to_string()
      }
      Error::Internal(msg) => {
        tracing::error!("internal error: {msg}");
        "internal server error".to_string()
      }
      other => other.to_string(),
    };

    let body =
      ErrorBody { success: false, error: message, code: self.code() };
    (self.status(), Json(body)).into_response()
  }
}
