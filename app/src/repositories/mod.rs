// vitrine_app/src/repositories/mod.rs

//! Storage interfaces used by handlers and flows.
//!
//! Every multi-row mutation is a single transaction in the Postgres
//! implementation. Booking statuses are recomputed inside the transaction that
//! changes a booking's products or a linked product's availability.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use crate::errors::Result;
use crate::models::{BookingDetails, Category, Picture, ProductDetails, User};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub title: String,
  pub description: String,
  pub price_cents: i32,
  pub available: bool,
  pub picture_id: Option<Uuid>,
  pub category_ids: Vec<Uuid>,
}

/// Partial product update. `None` leaves a field untouched; `picture_id:
/// Some(None)` detaches the picture.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i32>,
  pub available: Option<bool>,
  pub picture_id: Option<Option<Uuid>>,
  pub category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone)]
pub struct NewPicture {
  pub title: String,
  pub slug: String,
  pub image_path: String,
  pub file_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct PictureChanges {
  pub title: Option<String>,
  pub slug: Option<String>,
  /// New stored file, as `(image_path, file_path)`.
  pub file: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
  pub user_id: Uuid,
  pub quantity: i32,
  pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub email: String,
  pub password_hash: String,
  pub roles: Vec<String>,
  pub api_token: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
  pub email: Option<String>,
  pub password_hash: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
  async fn list(&self) -> Result<Vec<ProductDetails>>;
  async fn get(&self, id: Uuid) -> Result<Option<ProductDetails>>;
  /// Fails with `NotFound` when a referenced picture or category does not exist.
  async fn create(&self, new: NewProduct) -> Result<ProductDetails>;
  async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<ProductDetails>>;
  /// Removes the product from its bookings, whose statuses are recomputed.
  async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
  async fn list(&self) -> Result<Vec<Category>>;
  async fn get(&self, id: Uuid) -> Result<Option<Category>>;
  async fn create(&self, name: String) -> Result<Category>;
  async fn rename(&self, id: Uuid, name: String) -> Result<Option<Category>>;
  async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait PictureRepository: Send + Sync {
  async fn get(&self, id: Uuid) -> Result<Option<Picture>>;
  async fn create(&self, new: NewPicture) -> Result<Picture>;
  async fn update(&self, id: Uuid, changes: PictureChanges) -> Result<Option<Picture>>;
  /// Deletes the row and detaches it from every product. Returns the deleted row.
  async fn delete(&self, id: Uuid) -> Result<Option<Picture>>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
  /// All bookings, or only those of `owner`.
  async fn list(&self, owner: Option<Uuid>) -> Result<Vec<BookingDetails>>;
  async fn get(&self, id: Uuid) -> Result<Option<BookingDetails>>;
  async fn create(&self, new: NewBooking) -> Result<BookingDetails>;
  async fn delete(&self, id: Uuid) -> Result<bool>;
  /// Links a product and recomputes the status. `None` when the booking does not exist.
  async fn add_product(&self, booking_id: Uuid, product_id: Uuid) -> Result<Option<BookingDetails>>;
  async fn remove_product(&self, booking_id: Uuid, product_id: Uuid) -> Result<Option<BookingDetails>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
  async fn list(&self) -> Result<Vec<User>>;
  async fn get(&self, id: Uuid) -> Result<Option<User>>;
  async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn find_by_token(&self, token: &str) -> Result<Option<User>>;
  /// Fails with `Conflict` on a taken email and `Forbidden` on a second admin.
  async fn create(&self, new: NewUser) -> Result<User>;
  async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>>;
  /// Replaces the stored roles. Fails with `Forbidden` on a second admin.
  async fn set_roles(&self, id: Uuid, roles: Vec<String>) -> Result<Option<User>>;
  async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Handles to every repository, shared through `AppState`.
#[derive(Clone)]
pub struct Repositories {
  pub products: Arc<dyn ProductRepository>,
  pub categories: Arc<dyn CategoryRepository>,
  pub pictures: Arc<dyn PictureRepository>,
  pub bookings: Arc<dyn BookingRepository>,
  pub users: Arc<dyn UserRepository>,
}

impl Repositories {
  pub fn postgres(pool: sqlx::PgPool) -> Self {
    let store = Arc::new(postgres::PgStore::new(pool));
    Self {
      products: store.clone(),
      categories: store.clone(),
      pictures: store.clone(),
      bookings: store.clone(),
      users: store,
    }
  }
}

pub(crate) const ADMIN_EXISTS_MESSAGE: &str = "An administrator account already exists";
pub(crate) const EMAIL_TAKEN_MESSAGE: &str = "An account with this email already exists";
