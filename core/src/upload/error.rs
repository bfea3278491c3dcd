// vitrine/src/upload/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("No file or base64 payload was provided")]
  MissingPayload,

  #[error("Invalid base64 data: {0}")]
  InvalidBase64(#[from] base64::DecodeError),

  #[error("The uploaded file is empty")]
  Empty,

  #[error("The file is {size} bytes, the limit is {max} bytes")]
  TooLarge { size: u64, max: u64 },

  #[error("File extension '{0}' is not allowed")]
  DisallowedExtension(String),

  #[error("MIME type '{0}' is not allowed")]
  DisallowedMimeType(String),

  #[error("The file content is not a recognized image")]
  UnrecognizedContent,

  #[error("The file content is {detected} but its name ends in .{extension}")]
  ContentMismatch { detected: &'static str, extension: String },

  #[error("Path '{0}' escapes the upload directory")]
  PathEscapesUploadDir(String),

  #[error("File '{0}' was not found in the upload directory")]
  NotFound(String),

  #[error("Upload storage I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl UploadError {
  /// True when the request itself was at fault, as opposed to the storage.
  pub fn is_client_error(&self) -> bool {
    !matches!(self, UploadError::Io(_))
  }
}
