// vitrine/src/upload/validate.rs

//! Turns a raw upload (multipart file or base64 JSON field) into a `ValidatedImage`.

use crate::upload::error::UploadError;
use crate::upload::kind::ImageKind;
use crate::upload::policy::UploadPolicy;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// The two ways a client can send a picture.
#[derive(Debug, Clone)]
pub enum UploadSource {
  /// A `multipart/form-data` file part.
  Multipart {
    file_name: Option<String>,
    declared_mime: Option<String>,
    bytes: Vec<u8>,
  },
  /// A JSON body carrying `fileName` and base64 `fileData`.
  Base64 { file_name: String, file_data: String },
}

/// An upload that passed every check and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
  pub kind: ImageKind,
  /// Lowercased extension the stored file will carry.
  pub extension: String,
  /// Client file name reduced to `[A-Za-z0-9._-]`, if one was sent.
  pub original_name: Option<String>,
  pub bytes: Vec<u8>,
}

impl ValidatedImage {
  /// A fresh, time-ordered name for this image in the upload directory.
  pub fn generate_stored_name(&self) -> String {
    format!("{}.{}", Uuid::now_v7().simple(), self.extension)
  }

  pub fn size(&self) -> u64 {
    self.bytes.len() as u64
  }
}

impl UploadPolicy {
  /// Validates an upload. The image type always comes from the content itself;
  /// the client's declared type and extension only have to agree with it.
  #[instrument(name = "upload::validate", skip_all, err(Display))]
  pub fn validate(&self, source: UploadSource) -> Result<ValidatedImage, UploadError> {
    let (file_name, declared_mime, bytes) = match source {
      UploadSource::Multipart {
        file_name,
        declared_mime,
        bytes,
      } => (file_name, declared_mime, bytes),
      UploadSource::Base64 { file_name, file_data } => {
        let (declared_mime, bytes) = self.decode_base64(&file_data)?;
        (Some(file_name), declared_mime, bytes)
      }
    };

    if bytes.is_empty() {
      return Err(UploadError::Empty);
    }
    let size = bytes.len() as u64;
    if size > self.max_file_size_bytes {
      warn!(size, max = self.max_file_size_bytes, "Upload exceeds the size limit.");
      return Err(UploadError::TooLarge {
        size,
        max: self.max_file_size_bytes,
      });
    }

    if let Some(declared) = declared_mime.as_deref().filter(|m| !is_generic_binary(m)) {
      match ImageKind::from_mime_type(declared) {
        Some(kind) if self.allows(kind) => {}
        _ => return Err(UploadError::DisallowedMimeType(declared.to_string())),
      }
    }

    let kind = ImageKind::sniff(&bytes).ok_or(UploadError::UnrecognizedContent)?;
    if !self.allows(kind) {
      return Err(UploadError::DisallowedMimeType(kind.mime_type().to_string()));
    }

    let file_name = file_name.map(|n| sanitize_file_name(&n)).filter(|n| !n.is_empty());
    let extension = match file_name.as_deref().and_then(extension_of) {
      Some(ext) => {
        let declared_kind = ImageKind::from_extension(ext).ok_or_else(|| UploadError::DisallowedExtension(ext.to_string()))?;
        if declared_kind != kind {
          return Err(UploadError::ContentMismatch {
            detected: kind.mime_type(),
            extension: ext.to_ascii_lowercase(),
          });
        }
        ext.to_ascii_lowercase()
      }
      None => kind.canonical_extension().to_string(),
    };

    debug!(%kind, size, %extension, "Upload validated.");
    Ok(ValidatedImage {
      kind,
      extension,
      original_name: file_name,
      bytes,
    })
  }

  /// Decodes base64 `fileData`, accepting an optional `data:<mime>;base64,` prefix
  /// and embedded whitespace. Returns the MIME type named by the prefix, if any.
  fn decode_base64(&self, file_data: &str) -> Result<(Option<String>, Vec<u8>), UploadError> {
    let (declared_mime, payload) = match file_data.strip_prefix("data:") {
      Some(rest) => match rest.split_once(',') {
        Some((header, payload)) => {
          let mime = header.strip_suffix(";base64").unwrap_or(header);
          (Some(mime.to_string()).filter(|m| !m.is_empty()), payload)
        }
        None => return Err(UploadError::MissingPayload),
      },
      None => (None, file_data),
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
      return Err(UploadError::Empty);
    }
    if compact.len() as u64 > self.max_encoded_len() {
      let approx_size = compact.len() as u64 / 4 * 3;
      return Err(UploadError::TooLarge {
        size: approx_size,
        max: self.max_file_size_bytes,
      });
    }
    let bytes = BASE64_STANDARD.decode(compact.as_bytes())?;
    Ok((declared_mime, bytes))
  }
}

/// `application/octet-stream` says nothing about the file, so it is not checked
/// against the allow-list; sniffing decides instead.
fn is_generic_binary(mime: &str) -> bool {
  mime.trim().eq_ignore_ascii_case("application/octet-stream")
}

fn extension_of(file_name: &str) -> Option<&str> {
  let (stem, ext) = file_name.rsplit_once('.')?;
  if stem.is_empty() || ext.is_empty() {
    return None;
  }
  Some(ext)
}

/// Keeps only `[A-Za-z0-9._-]` and drops leading dots, so the result can never
/// name a hidden file or a parent directory.
pub fn sanitize_file_name(file_name: &str) -> String {
  let kept: String = file_name
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    .collect();
  kept.trim_start_matches('.').to_string()
}
