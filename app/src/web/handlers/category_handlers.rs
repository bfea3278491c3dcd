// vitrine_app/src/web/handlers/category_handlers.rs

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::category::MAX_NAME_LEN;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CategoryPayload {
  pub name: String,
}

fn check_name(name: &str) -> Result<String, AppError> {
  let name = name.trim();
  let len = name.chars().count();
  if len == 0 || len > MAX_NAME_LEN {
    return Err(AppError::Validation(format!(
      "Category name must be between 1 and {} characters.",
      MAX_NAME_LEN
    )));
  }
  Ok(name.to_string())
}

fn not_found(id: Uuid) -> AppError {
  AppError::NotFound(format!("Category with ID {} not found.", id))
}

#[instrument(name = "handler::list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = app_state.repos.categories.list().await?;
  Ok(HttpResponse::Ok().json(json!({ "categories": categories })))
}

#[instrument(name = "handler::get_category", skip(app_state, path), fields(category_id = %path.as_ref()))]
pub async fn get_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  let category = app_state.repos.categories.get(id).await?.ok_or_else(|| not_found(id))?;
  Ok(HttpResponse::Ok().json(json!({ "category": category })))
}

#[instrument(name = "handler::create_category", skip(app_state, user, req_payload))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let name = check_name(&req_payload.name)?;
  let category = app_state.repos.categories.create(name).await?;
  info!(category_id = %category.id, "Category created.");

  let location = app_state.config.absolute_url(&format!("/api/category/{}", category.id));
  Ok(HttpResponse::Created().insert_header((header::LOCATION, location)).json(json!({ "category": category })))
}

#[instrument(name = "handler::update_category", skip(app_state, user, path, req_payload), fields(category_id = %path.as_ref()))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let id = path.into_inner();
  let name = check_name(&req_payload.name)?;
  let category = app_state.repos.categories.rename(id, name).await?.ok_or_else(|| not_found(id))?;
  Ok(HttpResponse::Ok().json(json!({ "category": category })))
}

#[instrument(name = "handler::delete_category", skip(app_state, user, path), fields(category_id = %path.as_ref()))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let id = path.into_inner();
  if !app_state.repos.categories.delete(id).await? {
    return Err(not_found(id));
  }
  info!("Category deleted.");
  Ok(HttpResponse::NoContent().finish())
}
