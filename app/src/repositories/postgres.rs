// vitrine_app/src/repositories/postgres.rs

use super::{
  BookingRepository, CategoryRepository, NewBooking, NewPicture, NewProduct, NewUser, PictureChanges, PictureRepository,
  ProductChanges, ProductRepository, ProfileChanges, UserRepository, ADMIN_EXISTS_MESSAGE, EMAIL_TAKEN_MESSAGE,
};
use crate::errors::{AppError, Result};
use crate::models::{Booking, BookingDetails, Category, Picture, Product, ProductDetails, User};
use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use vitrine::BookingStatus;

const PRODUCT_COLUMNS: &str = "id, title, description, price_cents, available, picture_id, created_at, updated_at";
const PICTURE_COLUMNS: &str = "id, title, slug, image_path, file_path, created_at, updated_at";
const BOOKING_COLUMNS: &str = "id, user_id, quantity, status, created_at, updated_at";
const USER_COLUMNS: &str =
  "id, email, password_hash, roles, api_token, first_name, last_name, created_at, updated_at";

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

/// Turns constraint violations into the client-facing errors they stand for.
fn map_db_error(err: sqlx::Error) -> AppError {
  if let sqlx::Error::Database(db_err) = &err {
    match db_err.constraint() {
      Some("users_single_admin") => return AppError::Forbidden(ADMIN_EXISTS_MESSAGE.to_string()),
      Some("users_email_key") => return AppError::Conflict(EMAIL_TAKEN_MESSAGE.to_string()),
      _ => {}
    }
    if db_err.is_foreign_key_violation() {
      return AppError::NotFound(format!(
        "A referenced resource does not exist ({})",
        db_err.constraint().unwrap_or("foreign key")
      ));
    }
    if db_err.is_check_violation() {
      return AppError::Validation(format!(
        "Value rejected by constraint {}",
        db_err.constraint().unwrap_or("check")
      ));
    }
  }
  AppError::Sqlx(err)
}

fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
  let mut ids = ids.to_vec();
  ids.sort();
  ids.dedup();
  ids
}

#[derive(FromRow)]
struct ProductCategoryRow {
  product_id: Uuid,
  #[sqlx(flatten)]
  category: Category,
}

#[derive(FromRow)]
struct BookingProductRow {
  booking_id: Uuid,
  #[sqlx(flatten)]
  product: Product,
}

async fn load_product_details(conn: &mut PgConnection, products: Vec<Product>) -> Result<Vec<ProductDetails>> {
  if products.is_empty() {
    return Ok(Vec::new());
  }
  let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
  let picture_ids: Vec<Uuid> = products.iter().filter_map(|p| p.picture_id).collect();

  let category_rows: Vec<ProductCategoryRow> = sqlx::query_as(
    "SELECT pc.product_id, c.id, c.name, c.created_at, c.updated_at \
     FROM product_categories pc JOIN categories c ON c.id = pc.category_id \
     WHERE pc.product_id = ANY($1) ORDER BY c.name",
  )
  .bind(product_ids.as_slice())
  .fetch_all(&mut *conn)
  .await?;

  let pictures: Vec<Picture> = if picture_ids.is_empty() {
    Vec::new()
  } else {
    sqlx::query_as(&format!("SELECT {PICTURE_COLUMNS} FROM pictures WHERE id = ANY($1)"))
      .bind(picture_ids.as_slice())
      .fetch_all(&mut *conn)
      .await?
  };

  let mut categories_by_product: HashMap<Uuid, Vec<Category>> = HashMap::new();
  for row in category_rows {
    categories_by_product.entry(row.product_id).or_default().push(row.category);
  }
  let pictures_by_id: HashMap<Uuid, Picture> = pictures.into_iter().map(|p| (p.id, p)).collect();

  Ok(
    products
      .into_iter()
      .map(|product| ProductDetails {
        picture: product.picture_id.and_then(|id| pictures_by_id.get(&id).cloned()),
        categories: categories_by_product.remove(&product.id).unwrap_or_default(),
        product,
      })
      .collect(),
  )
}

async fn fetch_product_details(conn: &mut PgConnection, id: Uuid) -> Result<Option<ProductDetails>> {
  let product: Option<Product> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
  match product {
    Some(product) => Ok(load_product_details(conn, vec![product]).await?.pop()),
    None => Ok(None),
  }
}

async fn replace_product_categories(conn: &mut PgConnection, product_id: Uuid, category_ids: &[Uuid]) -> Result<()> {
  sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
  if category_ids.is_empty() {
    return Ok(());
  }
  sqlx::query(
    "INSERT INTO product_categories (product_id, category_id) \
     SELECT $1, category_id FROM UNNEST($2::uuid[]) AS category_id",
  )
  .bind(product_id)
  .bind(dedup_ids(category_ids).as_slice())
  .execute(&mut *conn)
  .await
  .map_err(map_db_error)?;
  Ok(())
}

async fn load_booking_details(conn: &mut PgConnection, bookings: Vec<Booking>) -> Result<Vec<BookingDetails>> {
  if bookings.is_empty() {
    return Ok(Vec::new());
  }
  let booking_ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
  let rows: Vec<BookingProductRow> = sqlx::query_as(
    "SELECT bp.booking_id, p.id, p.title, p.description, p.price_cents, p.available, p.picture_id, \
     p.created_at, p.updated_at \
     FROM booking_products bp JOIN products p ON p.id = bp.product_id \
     WHERE bp.booking_id = ANY($1) ORDER BY p.title",
  )
  .bind(booking_ids.as_slice())
  .fetch_all(&mut *conn)
  .await?;

  let mut products_by_booking: HashMap<Uuid, Vec<Product>> = HashMap::new();
  for row in rows {
    products_by_booking.entry(row.booking_id).or_default().push(row.product);
  }
  Ok(
    bookings
      .into_iter()
      .map(|booking| BookingDetails {
        products: products_by_booking.remove(&booking.id).unwrap_or_default(),
        booking,
      })
      .collect(),
  )
}

async fn fetch_booking_details(conn: &mut PgConnection, id: Uuid) -> Result<Option<BookingDetails>> {
  let booking: Option<Booking> = sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
  match booking {
    Some(booking) => Ok(load_booking_details(conn, vec![booking]).await?.pop()),
    None => Ok(None),
  }
}

/// Locks the booking row. Returns `false` when the booking does not exist.
async fn lock_booking(conn: &mut PgConnection, booking_id: Uuid) -> Result<bool> {
  let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
    .bind(booking_id)
    .fetch_optional(&mut *conn)
    .await?;
  Ok(locked.is_some())
}

/// Recomputes the status of a booking whose row the caller has locked.
async fn refresh_booking_status(conn: &mut PgConnection, booking_id: Uuid) -> Result<BookingStatus> {
  let availability: Vec<bool> = sqlx::query_scalar(
    "SELECT p.available FROM booking_products bp JOIN products p ON p.id = bp.product_id WHERE bp.booking_id = $1",
  )
  .bind(booking_id)
  .fetch_all(&mut *conn)
  .await?;
  let status = BookingStatus::derive(availability);
  sqlx::query("UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 AND status <> $2")
    .bind(booking_id)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;
  debug!(%booking_id, %status, "Booking status recomputed.");
  Ok(status)
}

/// Locks and refreshes every booking that links `product_id`, in id order.
async fn refresh_bookings_of_product(conn: &mut PgConnection, product_id: Uuid) -> Result<Vec<Uuid>> {
  let booking_ids: Vec<Uuid> = sqlx::query_scalar(
    "SELECT b.id FROM bookings b JOIN booking_products bp ON bp.booking_id = b.id \
     WHERE bp.product_id = $1 ORDER BY b.id FOR UPDATE OF b",
  )
  .bind(product_id)
  .fetch_all(&mut *conn)
  .await?;
  for booking_id in &booking_ids {
    refresh_booking_status(conn, *booking_id).await?;
  }
  Ok(booking_ids)
}

#[async_trait]
impl ProductRepository for PgStore {
  #[instrument(name = "PgStore::list_products", skip(self))]
  async fn list(&self) -> Result<Vec<ProductDetails>> {
    let mut conn = self.pool.acquire().await?;
    let products: Vec<Product> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY title ASC"))
      .fetch_all(&mut *conn)
      .await?;
    load_product_details(&mut conn, products).await
  }

  async fn get(&self, id: Uuid) -> Result<Option<ProductDetails>> {
    let mut conn = self.pool.acquire().await?;
    fetch_product_details(&mut conn, id).await
  }

  #[instrument(name = "PgStore::create_product", skip(self, new), fields(title = %new.title))]
  async fn create(&self, new: NewProduct) -> Result<ProductDetails> {
    let mut tx = self.pool.begin().await?;
    let id = Uuid::new_v4();
    sqlx::query(
      "INSERT INTO products (id, title, description, price_cents, available, picture_id) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.price_cents)
    .bind(new.available)
    .bind(new.picture_id)
    .execute(&mut *tx)
    .await
    .map_err(map_db_error)?;
    replace_product_categories(&mut tx, id, &new.category_ids).await?;
    let details = fetch_product_details(&mut tx, id)
      .await?
      .ok_or_else(|| AppError::Internal("Created product vanished before commit".to_string()))?;
    tx.commit().await?;
    info!(product_id = %id, "Product created.");
    Ok(details)
  }

  #[instrument(name = "PgStore::update_product", skip(self, changes))]
  async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<ProductDetails>> {
    let mut tx = self.pool.begin().await?;
    let previous_availability: Option<bool> =
      sqlx::query_scalar("SELECT available FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(previous_availability) = previous_availability else {
      return Ok(None);
    };

    sqlx::query(
      "UPDATE products SET title = COALESCE($2, title), description = COALESCE($3, description), \
       price_cents = COALESCE($4, price_cents), available = COALESCE($5, available), \
       picture_id = CASE WHEN $6 THEN $7 ELSE picture_id END, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.price_cents)
    .bind(changes.available)
    .bind(changes.picture_id.is_some())
    .bind(changes.picture_id.flatten())
    .execute(&mut *tx)
    .await
    .map_err(map_db_error)?;

    if let Some(category_ids) = &changes.category_ids {
      replace_product_categories(&mut tx, id, category_ids).await?;
    }
    if changes.available.is_some_and(|now| now != previous_availability) {
      let refreshed = refresh_bookings_of_product(&mut tx, id).await?;
      info!(product_id = %id, bookings = refreshed.len(), "Availability changed, booking statuses refreshed.");
    }

    let details = fetch_product_details(&mut tx, id).await?;
    tx.commit().await?;
    Ok(details)
  }

  #[instrument(name = "PgStore::delete_product", skip(self))]
  async fn delete(&self, id: Uuid) -> Result<bool> {
    let mut tx = self.pool.begin().await?;
    let booking_ids: Vec<Uuid> = sqlx::query_scalar(
      "SELECT b.id FROM bookings b JOIN booking_products bp ON bp.booking_id = b.id \
       WHERE bp.product_id = $1 ORDER BY b.id FOR UPDATE OF b",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;
    let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?
      .rows_affected()
      > 0;
    for booking_id in &booking_ids {
      refresh_booking_status(&mut tx, *booking_id).await?;
    }
    tx.commit().await?;
    Ok(deleted)
  }
}

#[async_trait]
impl CategoryRepository for PgStore {
  async fn list(&self) -> Result<Vec<Category>> {
    Ok(
      sqlx::query_as("SELECT id, name, created_at, updated_at FROM categories ORDER BY name ASC")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn get(&self, id: Uuid) -> Result<Option<Category>> {
    Ok(
      sqlx::query_as("SELECT id, name, created_at, updated_at FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create(&self, name: String) -> Result<Category> {
    sqlx::query_as("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name, created_at, updated_at")
      .bind(Uuid::new_v4())
      .bind(name)
      .fetch_one(&self.pool)
      .await
      .map_err(map_db_error)
  }

  async fn rename(&self, id: Uuid, name: String) -> Result<Option<Category>> {
    sqlx::query_as(
      "UPDATE categories SET name = $2, updated_at = now() WHERE id = $1 RETURNING id, name, created_at, updated_at",
    )
    .bind(id)
    .bind(name)
    .fetch_optional(&self.pool)
    .await
    .map_err(map_db_error)
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl PictureRepository for PgStore {
  async fn get(&self, id: Uuid) -> Result<Option<Picture>> {
    Ok(
      sqlx::query_as(&format!("SELECT {PICTURE_COLUMNS} FROM pictures WHERE id = $1"))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::create_picture", skip(self, new), fields(slug = %new.slug))]
  async fn create(&self, new: NewPicture) -> Result<Picture> {
    sqlx::query_as(&format!(
      "INSERT INTO pictures (id, title, slug, image_path, file_path) VALUES ($1, $2, $3, $4, $5) \
       RETURNING {PICTURE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.title)
    .bind(new.slug)
    .bind(new.image_path)
    .bind(new.file_path)
    .fetch_one(&self.pool)
    .await
    .map_err(map_db_error)
  }

  async fn update(&self, id: Uuid, changes: PictureChanges) -> Result<Option<Picture>> {
    let (image_path, file_path) = changes.file.unzip();
    sqlx::query_as(&format!(
      "UPDATE pictures SET title = COALESCE($2, title), slug = COALESCE($3, slug), \
       image_path = COALESCE($4, image_path), file_path = COALESCE($5, file_path), updated_at = now() \
       WHERE id = $1 RETURNING {PICTURE_COLUMNS}"
    ))
    .bind(id)
    .bind(changes.title)
    .bind(changes.slug)
    .bind(image_path)
    .bind(file_path)
    .fetch_optional(&self.pool)
    .await
    .map_err(map_db_error)
  }

  #[instrument(name = "PgStore::delete_picture", skip(self))]
  async fn delete(&self, id: Uuid) -> Result<Option<Picture>> {
    // products.picture_id is ON DELETE SET NULL, which detaches the picture.
    Ok(
      sqlx::query_as(&format!("DELETE FROM pictures WHERE id = $1 RETURNING {PICTURE_COLUMNS}"))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }
}

#[async_trait]
impl BookingRepository for PgStore {
  async fn list(&self, owner: Option<Uuid>) -> Result<Vec<BookingDetails>> {
    let mut conn = self.pool.acquire().await?;
    let bookings: Vec<Booking> = sqlx::query_as(&format!(
      "SELECT {BOOKING_COLUMNS} FROM bookings WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC"
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;
    load_booking_details(&mut conn, bookings).await
  }

  async fn get(&self, id: Uuid) -> Result<Option<BookingDetails>> {
    let mut conn = self.pool.acquire().await?;
    fetch_booking_details(&mut conn, id).await
  }

  #[instrument(name = "PgStore::create_booking", skip(self, new), fields(user_id = %new.user_id))]
  async fn create(&self, new: NewBooking) -> Result<BookingDetails> {
    let mut tx = self.pool.begin().await?;
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO bookings (id, user_id, quantity) VALUES ($1, $2, $3)")
      .bind(id)
      .bind(new.user_id)
      .bind(new.quantity)
      .execute(&mut *tx)
      .await
      .map_err(map_db_error)?;
    lock_booking(&mut tx, id).await?;
    if !new.product_ids.is_empty() {
      sqlx::query(
        "INSERT INTO booking_products (booking_id, product_id) SELECT $1, product_id FROM UNNEST($2::uuid[]) AS product_id",
      )
      .bind(id)
      .bind(dedup_ids(&new.product_ids).as_slice())
      .execute(&mut *tx)
      .await
      .map_err(map_db_error)?;
    }
    refresh_booking_status(&mut tx, id).await?;
    let details = fetch_booking_details(&mut tx, id)
      .await?
      .ok_or_else(|| AppError::Internal("Created booking vanished before commit".to_string()))?;
    tx.commit().await?;
    info!(booking_id = %id, status = %details.booking.status, "Booking created.");
    Ok(details)
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bookings WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(name = "PgStore::add_booking_product", skip(self))]
  async fn add_product(&self, booking_id: Uuid, product_id: Uuid) -> Result<Option<BookingDetails>> {
    let mut tx = self.pool.begin().await?;
    if !lock_booking(&mut tx, booking_id).await? {
      return Ok(None);
    }
    sqlx::query("INSERT INTO booking_products (booking_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
      .bind(booking_id)
      .bind(product_id)
      .execute(&mut *tx)
      .await
      .map_err(map_db_error)?;
    refresh_booking_status(&mut tx, booking_id).await?;
    let details = fetch_booking_details(&mut tx, booking_id).await?;
    tx.commit().await?;
    Ok(details)
  }

  #[instrument(name = "PgStore::remove_booking_product", skip(self))]
  async fn remove_product(&self, booking_id: Uuid, product_id: Uuid) -> Result<Option<BookingDetails>> {
    let mut tx = self.pool.begin().await?;
    if !lock_booking(&mut tx, booking_id).await? {
      return Ok(None);
    }
    let removed = sqlx::query("DELETE FROM booking_products WHERE booking_id = $1 AND product_id = $2")
      .bind(booking_id)
      .bind(product_id)
      .execute(&mut *tx)
      .await?
      .rows_affected();
    if removed == 0 {
      return Err(AppError::NotFound(format!(
        "Product {} is not part of booking {}",
        product_id, booking_id
      )));
    }
    refresh_booking_status(&mut tx, booking_id).await?;
    let details = fetch_booking_details(&mut tx, booking_id).await?;
    tx.commit().await?;
    Ok(details)
  }
}

#[async_trait]
impl UserRepository for PgStore {
  async fn list(&self) -> Result<Vec<User>> {
    Ok(
      sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"))
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn get(&self, id: Uuid) -> Result<Option<User>> {
    Ok(
      sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE api_token = $1"))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::create_user", skip(self, new), fields(email = %new.email))]
  async fn create(&self, new: NewUser) -> Result<User> {
    sqlx::query_as(&format!(
      "INSERT INTO users (id, email, password_hash, roles, api_token, first_name, last_name) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.roles)
    .bind(new.api_token)
    .bind(new.first_name)
    .bind(new.last_name)
    .fetch_one(&self.pool)
    .await
    .map_err(map_db_error)
  }

  async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>> {
    sqlx::query_as(&format!(
      "UPDATE users SET email = COALESCE($2, email), password_hash = COALESCE($3, password_hash), \
       first_name = COALESCE($4, first_name), last_name = COALESCE($5, last_name), updated_at = now() \
       WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(changes.first_name)
    .bind(changes.last_name)
    .fetch_optional(&self.pool)
    .await
    .map_err(map_db_error)
  }

  #[instrument(name = "PgStore::set_roles", skip(self))]
  async fn set_roles(&self, id: Uuid, roles: Vec<String>) -> Result<Option<User>> {
    sqlx::query_as(&format!(
      "UPDATE users SET roles = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(roles)
    .fetch_optional(&self.pool)
    .await
    .map_err(map_db_error)
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }
}
