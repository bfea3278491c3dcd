// vitrine_app/src/web/handlers/product_handlers.rs

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::MAX_TITLE_LEN;
use crate::repositories::{NewProduct, ProductChanges};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use crate::web::extract::double_option;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub price_cents: i32,
  #[serde(default = "default_available")]
  pub available: bool,
  pub picture_id: Option<Uuid>,
  #[serde(default)]
  pub category_ids: Vec<Uuid>,
}

fn default_available() -> bool {
  true
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i32>,
  pub available: Option<bool>,
  /// `null` detaches the picture.
  #[serde(default, deserialize_with = "double_option")]
  pub picture_id: Option<Option<Uuid>>,
  pub category_ids: Option<Vec<Uuid>>,
}

fn check_title(title: &str) -> Result<String, AppError> {
  let title = title.trim();
  let len = title.chars().count();
  if len == 0 || len > MAX_TITLE_LEN {
    return Err(AppError::Validation(format!(
      "Product title must be between 1 and {} characters.",
      MAX_TITLE_LEN
    )));
  }
  Ok(title.to_string())
}

fn check_price(price_cents: i32) -> Result<i32, AppError> {
  if price_cents < 0 {
    return Err(AppError::Validation("Product price cannot be negative.".to_string()));
  }
  Ok(price_cents)
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.repos.products.list().await?;
  info!("Fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(json!({
      "message": "Products fetched successfully.",
      "products": products
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  match app_state.repos.products.get(product_id).await? {
    Some(product) => Ok(HttpResponse::Ok().json(json!({
        "message": "Product fetched successfully.",
        "product": product
    }))),
    None => {
      warn!("Product with ID {} not found.", product_id);
      Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)))
    }
  }
}

#[instrument(name = "handler::create_product", skip(app_state, user, req_payload), fields(user_id = %user.user.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<CreateProductPayload>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let payload = req_payload.into_inner();

  let new_product = NewProduct {
    title: check_title(&payload.title)?,
    description: payload.description,
    price_cents: check_price(payload.price_cents)?,
    available: payload.available,
    picture_id: payload.picture_id,
    category_ids: payload.category_ids,
  };
  let product = app_state.repos.products.create(new_product).await?;
  info!(product_id = %product.product.id, "Product created.");

  let location = app_state
    .config
    .absolute_url(&format!("/api/products/{}", product.product.id));
  Ok(HttpResponse::Created().insert_header((header::LOCATION, location)).json(json!({
      "message": "Product created successfully.",
      "product": product
  })))
}

#[instrument(name = "handler::update_product", skip(app_state, user, path, req_payload), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateProductPayload>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let product_id = path.into_inner();
  let payload = req_payload.into_inner();

  let changes = ProductChanges {
    title: payload.title.as_deref().map(check_title).transpose()?,
    description: payload.description,
    price_cents: payload.price_cents.map(check_price).transpose()?,
    available: payload.available,
    picture_id: payload.picture_id,
    category_ids: payload.category_ids,
  };
  let product = app_state
    .repos
    .products
    .update(product_id, changes)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))?;
  info!("Product updated.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Product updated successfully.",
      "product": product
  })))
}

#[instrument(name = "handler::delete_product", skip(app_state, user, path), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let product_id = path.into_inner();
  if !app_state.repos.products.delete(product_id).await? {
    return Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)));
  }
  info!("Product deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Product deleted successfully." })))
}
