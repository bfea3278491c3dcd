// vitrine_app/src/models/product.rs

use super::{Category, Picture};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub price_cents: i32,
  pub available: bool,
  pub picture_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A product with its picture and categories resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
  #[serde(flatten)]
  pub product: Product,
  pub picture: Option<Picture>,
  pub categories: Vec<Category>,
}
