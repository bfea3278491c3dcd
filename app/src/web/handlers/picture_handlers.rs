// vitrine_app/src/web/handlers/picture_handlers.rs

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::{PictureCtxData, PictureTarget};
use crate::models::Picture;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use crate::web::extract::{read_picture_form, PictureForm};
use vitrine::{FlowContext, FlowOutcome, ImageKind, UploadError};

/// Runs the picture flow and returns the picture it produced.
async fn run_picture_flow(app_state: &AppState, target: PictureTarget, form: PictureForm) -> Result<Picture, AppError> {
  let mut data = PictureCtxData::new(app_state.clone(), target);
  data.source = form.source;
  data.title = form.title;
  data.slug = form.slug;
  let ctx = FlowContext::new(data);

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let picture = ctx.read().picture.clone();
      picture.ok_or_else(|| AppError::Internal("Picture flow completed without a picture.".to_string()))
    }
    FlowOutcome::Stopped => {
      warn!("Picture flow was stopped by a handler.");
      Err(AppError::FlowHalted)
    }
  }
}

fn bytes_response(bytes: Vec<u8>) -> HttpResponse {
  let content_type = ImageKind::sniff(&bytes).map_or("application/octet-stream", ImageKind::mime_type);
  HttpResponse::Ok()
    .insert_header((header::CONTENT_TYPE, content_type))
    .insert_header(("X-Content-Type-Options", "nosniff"))
    .body(bytes)
}

#[instrument(name = "handler::create_picture", skip_all, fields(user_id = %user.user.id))]
pub async fn create_picture_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let form = read_picture_form(&req, payload, app_state.config.upload_max_bytes).await?;
  if form.source.is_none() {
    return Err(UploadError::MissingPayload.into());
  }

  let picture = run_picture_flow(&app_state, PictureTarget::New, form).await?;
  info!(picture_id = %picture.id, "Picture created.");

  let location = app_state.config.absolute_url(&format!("/api/pictures/{}", picture.id));
  Ok(HttpResponse::Created().insert_header((header::LOCATION, location)).json(json!({
      "message": "Picture uploaded successfully.",
      "picture": picture
  })))
}

#[instrument(name = "handler::update_picture", skip_all, fields(picture_id = %path.as_ref()))]
pub async fn update_picture_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let picture_id = path.into_inner();
  let form = read_picture_form(&req, payload, app_state.config.upload_max_bytes).await?;

  let picture = run_picture_flow(&app_state, PictureTarget::Existing(picture_id), form).await?;
  info!("Picture updated.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Picture updated successfully.",
      "picture": picture
  })))
}

/// Serves the picture's image bytes. The content type comes from the bytes,
/// never from the stored name.
#[instrument(name = "handler::show_picture", skip(app_state, path), fields(picture_id = %path.as_ref()))]
pub async fn show_picture_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let picture_id = path.into_inner();
  let picture = app_state
    .repos
    .pictures
    .get(picture_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Picture with ID {} not found.", picture_id)))?;
  let bytes = app_state.uploads.read(&picture.image_path).await?;
  Ok(bytes_response(bytes))
}

#[instrument(name = "handler::delete_picture", skip(app_state, user, path), fields(picture_id = %path.as_ref()))]
pub async fn delete_picture_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  user.require_catalog_manager()?;
  let picture_id = path.into_inner();
  let picture = app_state
    .repos
    .pictures
    .delete(picture_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Picture with ID {} not found.", picture_id)))?;

  // The row is gone and products are detached; a file left behind is only logged.
  match app_state.uploads.remove(&picture.image_path).await {
    Ok(true) => info!(image_path = %picture.image_path, "Picture and its file deleted."),
    Ok(false) => warn!(image_path = %picture.image_path, "Picture deleted; its file was already gone."),
    Err(e) => warn!(error = %e, image_path = %picture.image_path, "Picture deleted; removing its file failed."),
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Picture deleted successfully." })))
}

/// Public file serving under the upload prefix.
#[instrument(name = "handler::serve_upload", skip(app_state))]
pub async fn serve_upload_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let bytes = app_state.uploads.read(&path.into_inner()).await?;
  Ok(bytes_response(bytes))
}
