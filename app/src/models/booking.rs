// vitrine_app/src/models/booking.rs

use super::Product;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
  pub id: Uuid,
  pub user_id: Uuid,
  pub quantity: i32,
  /// `Disponible` or `Indisponible`, kept in sync with the linked products.
  pub status: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
  #[serde(flatten)]
  pub booking: Booking,
  pub products: Vec<Product>,
}
