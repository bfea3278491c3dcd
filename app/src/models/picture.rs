// vitrine_app/src/models/picture.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
  pub id: Uuid,
  pub title: String,
  pub slug: String,
  /// Stored file name inside the upload directory.
  pub image_path: String,
  /// Public URL of the file.
  pub file_path: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
