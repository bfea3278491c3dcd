// vitrine_app/src/web/extract.rs

//! Reading request bodies that the stock extractors do not cover: picture
//! uploads arrive either as multipart forms or as JSON with base64 data.

use crate::errors::{AppError, Result};
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use futures_util::StreamExt;
use serde::{Deserialize, Deserializer};
use tracing::debug;
use vitrine::{UploadError, UploadSource};

/// Multipart field names accepted for the picture file.
const FILE_FIELDS: [&str; 2] = ["picture", "image"];
/// Upper bound for a plain text form field.
const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;
/// Room for the JSON envelope around the base64 payload.
const JSON_ENVELOPE_BYTES: u64 = 16 * 1024;

/// Distinguishes an absent field from an explicit `null`: missing stays
/// `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PictureJsonPayload {
  file_name: Option<String>,
  file_data: Option<String>,
  title: Option<String>,
  slug: Option<String>,
}

/// A picture request body, whichever encoding it came in.
#[derive(Debug, Default)]
pub struct PictureForm {
  pub source: Option<UploadSource>,
  pub title: Option<String>,
  pub slug: Option<String>,
}

fn is_multipart(req: &HttpRequest) -> bool {
  req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

pub async fn read_picture_form(req: &HttpRequest, payload: web::Payload, max_bytes: u64) -> Result<PictureForm> {
  if is_multipart(req) {
    read_multipart(req, payload, max_bytes).await
  } else {
    read_json(payload, max_bytes).await
  }
}

/// Transport cap for a JSON picture body. Base64 grows the data by a third and
/// line wrapping (JSON-escaped `\r\n` every 76 columns) adds about 5% more;
/// the decoded size is enforced later by the upload policy.
fn json_body_limit(max_bytes: u64) -> u64 {
  let encoded = max_bytes.div_ceil(3).saturating_mul(4);
  encoded.saturating_add(encoded / 10).saturating_add(JSON_ENVELOPE_BYTES)
}

async fn read_json(mut payload: web::Payload, max_bytes: u64) -> Result<PictureForm> {
  let limit = json_body_limit(max_bytes);
  let mut body = web::BytesMut::new();
  while let Some(chunk) = payload.next().await {
    let chunk = chunk.map_err(|e| AppError::Validation(format!("Failed to read request body: {}", e)))?;
    let size = (body.len() + chunk.len()) as u64;
    if size > limit {
      return Err(AppError::PayloadTooLarge(format!(
        "The request body is over {} bytes, the upload limit is {} bytes",
        limit, max_bytes
      )));
    }
    body.extend_from_slice(&chunk);
  }
  if body.is_empty() {
    return Ok(PictureForm::default());
  }

  let parsed: PictureJsonPayload =
    serde_json::from_slice(&body).map_err(|e| AppError::Validation(format!("Invalid JSON payload: {}", e)))?;
  let source = match (parsed.file_name, parsed.file_data) {
    (Some(file_name), Some(file_data)) => Some(UploadSource::Base64 { file_name, file_data }),
    (None, None) => None,
    (None, Some(_)) => return Err(AppError::Validation("fileName is required with fileData.".to_string())),
    (Some(_), None) => return Err(UploadError::MissingPayload.into()),
  };
  Ok(PictureForm {
    source,
    title: parsed.title,
    slug: parsed.slug,
  })
}

async fn read_multipart(req: &HttpRequest, payload: web::Payload, max_bytes: u64) -> Result<PictureForm> {
  let mut multipart = Multipart::new(req.headers(), payload);
  let mut form = PictureForm::default();

  while let Some(field) = multipart.next().await {
    let mut field = field.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
    let name = field.name().unwrap_or_default().to_string();

    if FILE_FIELDS.contains(&name.as_str()) {
      let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string);
      let declared_mime = field.content_type().map(|m| m.essence_str().to_string());
      let mut bytes = Vec::new();
      while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
        let size = (bytes.len() + chunk.len()) as u64;
        if size > max_bytes {
          return Err(UploadError::TooLarge { size, max: max_bytes }.into());
        }
        bytes.extend_from_slice(&chunk);
      }
      debug!(field = %name, size = bytes.len(), "Received multipart file.");
      form.source = Some(UploadSource::Multipart {
        file_name,
        declared_mime,
        bytes,
      });
      continue;
    }

    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
      let chunk = chunk.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
      if data.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
        return Err(AppError::Validation(format!("Form field '{}' is too long.", name)));
      }
      data.extend_from_slice(&chunk);
    }
    let text = String::from_utf8(data).map_err(|_| AppError::Validation(format!("Form field '{}' is not UTF-8.", name)))?;
    match name.as_str() {
      "title" => form.title = Some(text),
      "slug" => form.slug = Some(text),
      other => debug!(field = %other, "Ignoring unknown multipart field."),
    }
  }
  Ok(form)
}
