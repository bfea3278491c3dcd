// vitrine_app/src/repositories/memory.rs

//! In-memory repositories for handler tests. Mirrors the database constraints
//! the Postgres store relies on (unique email, single admin, foreign keys).

use super::{
  BookingRepository, CategoryRepository, NewBooking, NewPicture, NewProduct, NewUser, PictureChanges, PictureRepository,
  ProductChanges, ProductRepository, ProfileChanges, Repositories, UserRepository, ADMIN_EXISTS_MESSAGE,
  EMAIL_TAKEN_MESSAGE,
};
use crate::errors::{AppError, Result};
use crate::models::{Booking, BookingDetails, Category, Picture, Product, ProductDetails, User};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;
use vitrine::BookingStatus;

#[derive(Default)]
struct Tables {
  products: BTreeMap<Uuid, Product>,
  product_categories: BTreeSet<(Uuid, Uuid)>,
  categories: BTreeMap<Uuid, Category>,
  pictures: BTreeMap<Uuid, Picture>,
  bookings: BTreeMap<Uuid, Booking>,
  booking_products: BTreeSet<(Uuid, Uuid)>,
  users: BTreeMap<Uuid, User>,
}

impl Tables {
  fn product_details(&self, product: &Product) -> ProductDetails {
    let mut categories: Vec<Category> = self
      .product_categories
      .iter()
      .filter(|(p, _)| *p == product.id)
      .filter_map(|(_, c)| self.categories.get(c).cloned())
      .collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    ProductDetails {
      picture: product.picture_id.and_then(|id| self.pictures.get(&id).cloned()),
      categories,
      product: product.clone(),
    }
  }

  fn booking_details(&self, booking: &Booking) -> BookingDetails {
    let mut products: Vec<Product> = self
      .booking_products
      .iter()
      .filter(|(b, _)| *b == booking.id)
      .filter_map(|(_, p)| self.products.get(p).cloned())
      .collect();
    products.sort_by(|a, b| a.title.cmp(&b.title));
    BookingDetails {
      booking: booking.clone(),
      products,
    }
  }

  fn refresh_booking_status(&mut self, booking_id: Uuid) {
    let status = BookingStatus::derive(
      self
        .booking_products
        .iter()
        .filter(|(b, _)| *b == booking_id)
        .filter_map(|(_, p)| self.products.get(p).map(|p| p.available)),
    );
    if let Some(booking) = self.bookings.get_mut(&booking_id) {
      if booking.status != status.as_str() {
        booking.status = status.as_str().to_string();
        booking.updated_at = Utc::now();
      }
    }
  }

  fn bookings_of_product(&self, product_id: Uuid) -> Vec<Uuid> {
    self.booking_products.iter().filter(|(_, p)| *p == product_id).map(|(b, _)| *b).collect()
  }

  fn check_categories(&self, category_ids: &[Uuid]) -> Result<()> {
    match category_ids.iter().find(|id| !self.categories.contains_key(id)) {
      Some(missing) => Err(AppError::NotFound(format!("Category {} not found", missing))),
      None => Ok(()),
    }
  }

  fn check_picture(&self, picture_id: Option<Uuid>) -> Result<()> {
    match picture_id {
      Some(id) if !self.pictures.contains_key(&id) => Err(AppError::NotFound(format!("Picture {} not found", id))),
      _ => Ok(()),
    }
  }

  fn check_user_constraints(&self, user_id: Uuid, email: &str, roles: &[String]) -> Result<()> {
    if self.users.values().any(|u| u.id != user_id && u.email == email) {
      return Err(AppError::Conflict(EMAIL_TAKEN_MESSAGE.to_string()));
    }
    let wants_admin = roles.iter().any(|r| r == "ROLE_ADMIN");
    if wants_admin && self.users.values().any(|u| u.id != user_id && u.is_admin()) {
      return Err(AppError::Forbidden(ADMIN_EXISTS_MESSAGE.to_string()));
    }
    Ok(())
  }
}

/// All tables behind one lock, so each call is atomic like a transaction.
#[derive(Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn repositories(&self) -> Repositories {
    let store = Arc::new(self.clone());
    Repositories {
      products: store.clone(),
      categories: store.clone(),
      pictures: store.clone(),
      bookings: store.clone(),
      users: store,
    }
  }

  pub fn picture_count(&self) -> usize {
    self.tables.lock().pictures.len()
  }
}

#[async_trait]
impl ProductRepository for MemoryStore {
  async fn list(&self) -> Result<Vec<ProductDetails>> {
    let tables = self.tables.lock();
    let mut products: Vec<&Product> = tables.products.values().collect();
    products.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(products.into_iter().map(|p| tables.product_details(p)).collect())
  }

  async fn get(&self, id: Uuid) -> Result<Option<ProductDetails>> {
    let tables = self.tables.lock();
    Ok(tables.products.get(&id).map(|p| tables.product_details(p)))
  }

  async fn create(&self, new: NewProduct) -> Result<ProductDetails> {
    let mut tables = self.tables.lock();
    tables.check_picture(new.picture_id)?;
    tables.check_categories(&new.category_ids)?;
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      title: new.title,
      description: new.description,
      price_cents: new.price_cents,
      available: new.available,
      picture_id: new.picture_id,
      created_at: now,
      updated_at: now,
    };
    for category_id in new.category_ids {
      tables.product_categories.insert((product.id, category_id));
    }
    tables.products.insert(product.id, product.clone());
    Ok(tables.product_details(&product))
  }

  async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<ProductDetails>> {
    let mut tables = self.tables.lock();
    let Some(mut product) = tables.products.get(&id).cloned() else {
      return Ok(None);
    };
    if let Some(picture_id) = changes.picture_id {
      tables.check_picture(picture_id)?;
      product.picture_id = picture_id;
    }
    if let Some(category_ids) = &changes.category_ids {
      tables.check_categories(category_ids)?;
      tables.product_categories.retain(|(p, _)| *p != id);
      for category_id in category_ids {
        tables.product_categories.insert((id, *category_id));
      }
    }
    let availability_changed = changes.available.is_some_and(|a| a != product.available);
    if let Some(title) = changes.title {
      product.title = title;
    }
    if let Some(description) = changes.description {
      product.description = description;
    }
    if let Some(price_cents) = changes.price_cents {
      product.price_cents = price_cents;
    }
    if let Some(available) = changes.available {
      product.available = available;
    }
    product.updated_at = Utc::now();
    tables.products.insert(id, product.clone());
    if availability_changed {
      for booking_id in tables.bookings_of_product(id) {
        tables.refresh_booking_status(booking_id);
      }
    }
    Ok(Some(tables.product_details(&product)))
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    if tables.products.remove(&id).is_none() {
      return Ok(false);
    }
    tables.product_categories.retain(|(p, _)| *p != id);
    let affected = tables.bookings_of_product(id);
    tables.booking_products.retain(|(_, p)| *p != id);
    for booking_id in affected {
      tables.refresh_booking_status(booking_id);
    }
    Ok(true)
  }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
  async fn list(&self) -> Result<Vec<Category>> {
    let mut categories: Vec<Category> = self.tables.lock().categories.values().cloned().collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Category>> {
    Ok(self.tables.lock().categories.get(&id).cloned())
  }

  async fn create(&self, name: String) -> Result<Category> {
    let now = Utc::now();
    let category = Category {
      id: Uuid::new_v4(),
      name,
      created_at: now,
      updated_at: now,
    };
    self.tables.lock().categories.insert(category.id, category.clone());
    Ok(category)
  }

  async fn rename(&self, id: Uuid, name: String) -> Result<Option<Category>> {
    let mut tables = self.tables.lock();
    Ok(tables.categories.get_mut(&id).map(|c| {
      c.name = name;
      c.updated_at = Utc::now();
      c.clone()
    }))
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    tables.product_categories.retain(|(_, c)| *c != id);
    Ok(tables.categories.remove(&id).is_some())
  }
}

#[async_trait]
impl PictureRepository for MemoryStore {
  async fn get(&self, id: Uuid) -> Result<Option<Picture>> {
    Ok(self.tables.lock().pictures.get(&id).cloned())
  }

  async fn create(&self, new: NewPicture) -> Result<Picture> {
    let now = Utc::now();
    let picture = Picture {
      id: Uuid::new_v4(),
      title: new.title,
      slug: new.slug,
      image_path: new.image_path,
      file_path: new.file_path,
      created_at: now,
      updated_at: now,
    };
    self.tables.lock().pictures.insert(picture.id, picture.clone());
    Ok(picture)
  }

  async fn update(&self, id: Uuid, changes: PictureChanges) -> Result<Option<Picture>> {
    let mut tables = self.tables.lock();
    Ok(tables.pictures.get_mut(&id).map(|p| {
      if let Some(title) = changes.title {
        p.title = title;
      }
      if let Some(slug) = changes.slug {
        p.slug = slug;
      }
      if let Some((image_path, file_path)) = changes.file {
        p.image_path = image_path;
        p.file_path = file_path;
      }
      p.updated_at = Utc::now();
      p.clone()
    }))
  }

  async fn delete(&self, id: Uuid) -> Result<Option<Picture>> {
    let mut tables = self.tables.lock();
    let removed = tables.pictures.remove(&id);
    if removed.is_some() {
      for product in tables.products.values_mut().filter(|p| p.picture_id == Some(id)) {
        product.picture_id = None;
      }
    }
    Ok(removed)
  }
}

#[async_trait]
impl BookingRepository for MemoryStore {
  async fn list(&self, owner: Option<Uuid>) -> Result<Vec<BookingDetails>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .bookings
        .values()
        .filter(|b| owner.map_or(true, |o| b.user_id == o))
        .map(|b| tables.booking_details(b))
        .collect(),
    )
  }

  async fn get(&self, id: Uuid) -> Result<Option<BookingDetails>> {
    let tables = self.tables.lock();
    Ok(tables.bookings.get(&id).map(|b| tables.booking_details(b)))
  }

  async fn create(&self, new: NewBooking) -> Result<BookingDetails> {
    let mut tables = self.tables.lock();
    if !tables.users.contains_key(&new.user_id) {
      return Err(AppError::NotFound(format!("User {} not found", new.user_id)));
    }
    if let Some(missing) = new.product_ids.iter().find(|p| !tables.products.contains_key(p)) {
      return Err(AppError::NotFound(format!("Product {} not found", missing)));
    }
    let now = Utc::now();
    let booking = Booking {
      id: Uuid::new_v4(),
      user_id: new.user_id,
      quantity: new.quantity,
      status: BookingStatus::Disponible.as_str().to_string(),
      created_at: now,
      updated_at: now,
    };
    tables.bookings.insert(booking.id, booking.clone());
    for product_id in new.product_ids {
      tables.booking_products.insert((booking.id, product_id));
    }
    tables.refresh_booking_status(booking.id);
    let stored = tables.bookings[&booking.id].clone();
    Ok(tables.booking_details(&stored))
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    tables.booking_products.retain(|(b, _)| *b != id);
    Ok(tables.bookings.remove(&id).is_some())
  }

  async fn add_product(&self, booking_id: Uuid, product_id: Uuid) -> Result<Option<BookingDetails>> {
    let mut tables = self.tables.lock();
    if !tables.bookings.contains_key(&booking_id) {
      return Ok(None);
    }
    if !tables.products.contains_key(&product_id) {
      return Err(AppError::NotFound(format!("Product {} not found", product_id)));
    }
    tables.booking_products.insert((booking_id, product_id));
    tables.refresh_booking_status(booking_id);
    let booking = tables.bookings[&booking_id].clone();
    Ok(Some(tables.booking_details(&booking)))
  }

  async fn remove_product(&self, booking_id: Uuid, product_id: Uuid) -> Result<Option<BookingDetails>> {
    let mut tables = self.tables.lock();
    if !tables.bookings.contains_key(&booking_id) {
      return Ok(None);
    }
    if !tables.booking_products.remove(&(booking_id, product_id)) {
      return Err(AppError::NotFound(format!(
        "Product {} is not part of booking {}",
        product_id, booking_id
      )));
    }
    tables.refresh_booking_status(booking_id);
    let booking = tables.bookings[&booking_id].clone();
    Ok(Some(tables.booking_details(&booking)))
  }
}

#[async_trait]
impl UserRepository for MemoryStore {
  async fn list(&self) -> Result<Vec<User>> {
    let mut users: Vec<User> = self.tables.lock().users.values().cloned().collect();
    users.sort_by_key(|u| u.created_at);
    Ok(users)
  }

  async fn get(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.lock().users.get(&id).cloned())
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.values().find(|u| u.email == email).cloned())
  }

  async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.values().find(|u| u.api_token == token).cloned())
  }

  async fn create(&self, new: NewUser) -> Result<User> {
    let mut tables = self.tables.lock();
    let id = Uuid::new_v4();
    tables.check_user_constraints(id, &new.email, &new.roles)?;
    let now = Utc::now();
    let user = User {
      id,
      email: new.email,
      password_hash: new.password_hash,
      roles: new.roles,
      api_token: new.api_token,
      first_name: new.first_name,
      last_name: new.last_name,
      created_at: now,
      updated_at: now,
    };
    tables.users.insert(id, user.clone());
    Ok(user)
  }

  async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>> {
    let mut tables = self.tables.lock();
    let Some(mut user) = tables.users.get(&id).cloned() else {
      return Ok(None);
    };
    if let Some(email) = changes.email {
      tables.check_user_constraints(id, &email, &[])?;
      user.email = email;
    }
    if let Some(hash) = changes.password_hash {
      user.password_hash = hash;
    }
    if let Some(first_name) = changes.first_name {
      user.first_name = Some(first_name);
    }
    if let Some(last_name) = changes.last_name {
      user.last_name = Some(last_name);
    }
    user.updated_at = Utc::now();
    tables.users.insert(id, user.clone());
    Ok(Some(user))
  }

  async fn set_roles(&self, id: Uuid, roles: Vec<String>) -> Result<Option<User>> {
    let mut tables = self.tables.lock();
    let Some(email) = tables.users.get(&id).map(|u| u.email.clone()) else {
      return Ok(None);
    };
    tables.check_user_constraints(id, &email, &roles)?;
    Ok(tables.users.get_mut(&id).map(|u| {
      u.roles = roles;
      u.updated_at = Utc::now();
      u.clone()
    }))
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let removed = tables.users.remove(&id).is_some();
    if removed {
      let owned: Vec<Uuid> = tables.bookings.values().filter(|b| b.user_id == id).map(|b| b.id).collect();
      for booking_id in owned {
        tables.bookings.remove(&booking_id);
        tables.booking_products.retain(|(b, _)| *b != booking_id);
      }
    }
    Ok(removed)
  }
}
