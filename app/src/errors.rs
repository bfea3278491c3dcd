// vitrine_app/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use vitrine::{FlowError, RoleError, UploadError};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  /// The request body outgrew its transport cap before it could be parsed.
  #[error("Payload Too Large: {0}")]
  PayloadTooLarge(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Upload Error: {0}")]
  Upload(#[from] UploadError),

  #[error("Role Error: {0}")]
  Role(#[from] RoleError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  /// A flow stopped before producing what the handler needs.
  #[error("Request processing was halted before completion.")]
  FlowHalted,
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Role(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      AppError::Upload(e) => match e {
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::PathEscapesUploadDir(_) => StatusCode::FORBIDDEN,
        UploadError::NotFound(_) => StatusCode::NOT_FOUND,
        UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
      },
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_)
      | AppError::FlowHalted => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }

    let body = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::PayloadTooLarge(m) => json!({ "error": m }),
      AppError::Role(e) => json!({ "error": e.to_string() }),
      AppError::Upload(UploadError::Io(e)) => json!({"error": "Upload storage failed", "detail": e.to_string()}),
      AppError::Upload(e) => json!({ "error": e.to_string() }),
      AppError::Config(m) => json!({"error": "Configuration issue", "detail": m}),
      AppError::Sqlx(_) => json!({"error": "Database operation failed"}),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({"error": "Workflow processing error", "detail": source.to_string()})
      }
      AppError::Internal(m) => json!({"error": "An internal error occurred", "detail": m}),
      AppError::FlowHalted => json!({"error": "Request processing was halted before completion."}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upload_errors_map_to_client_statuses() {
    let too_large = AppError::from(UploadError::TooLarge { size: 10, max: 5 });
    assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let escape = AppError::from(UploadError::PathEscapesUploadDir("../x".into()));
    assert_eq!(escape.status_code(), StatusCode::FORBIDDEN);

    let mime = AppError::from(UploadError::DisallowedMimeType("text/html".into()));
    assert_eq!(mime.status_code(), StatusCode::BAD_REQUEST);

    let io = AppError::from(UploadError::Io(std::io::Error::other("disk full")));
    assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn anyhow_wrapping_keeps_app_errors() {
    let wrapped = anyhow::Error::new(AppError::Conflict("taken".into()));
    assert!(matches!(AppError::from(wrapped), AppError::Conflict(m) if m == "taken"));

    let other = anyhow::anyhow!("boom");
    assert!(matches!(AppError::from(other), AppError::Internal(m) if m == "boom"));
  }
}
