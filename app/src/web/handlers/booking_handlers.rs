// vitrine_app/src/web/handlers/booking_handlers.rs

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::BookingCtxData;
use crate::models::BookingDetails;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use vitrine::{FlowContext, FlowOutcome};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
  pub quantity: i32,
  #[serde(default)]
  pub product_ids: Vec<Uuid>,
}

/// Loads a booking the caller may act on. Other users' bookings are
/// reported as forbidden unless the caller is staff.
async fn load_visible_booking(
  app_state: &AppState,
  user: &AuthenticatedUser,
  booking_id: Uuid,
) -> Result<BookingDetails, AppError> {
  let booking = app_state
    .repos
    .bookings
    .get(booking_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking with ID {} not found.", booking_id)))?;
  if booking.booking.user_id != user.user.id && !user.can_see_all_bookings() {
    warn!(%booking_id, "Booking belongs to another user.");
    return Err(AppError::Forbidden("This booking belongs to another user.".to_string()));
  }
  Ok(booking)
}

#[instrument(name = "handler::list_bookings", skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn list_bookings_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let owner = if user.can_see_all_bookings() { None } else { Some(user.user.id) };
  let bookings = app_state.repos.bookings.list(owner).await?;
  info!("Fetched {} bookings.", bookings.len());
  Ok(HttpResponse::Ok().json(json!({ "bookings": bookings })))
}

#[instrument(name = "handler::get_booking", skip(app_state, user, path), fields(booking_id = %path.as_ref()))]
pub async fn get_booking_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let booking = load_visible_booking(&app_state, &user, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "booking": booking })))
}

#[instrument(name = "handler::create_booking", skip(app_state, user, req_payload), fields(user_id = %user.user.id))]
pub async fn create_booking_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<CreateBookingPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = FlowContext::new(BookingCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: user.user.id,
    quantity: payload.quantity,
    product_ids: payload.product_ids,
    booking: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let booking = ctx.read().booking.clone();
      let booking =
        booking.ok_or_else(|| AppError::Internal("Booking flow completed without a booking.".to_string()))?;
      let location = app_state
        .config
        .absolute_url(&format!("/api/booking/{}", booking.booking.id));
      Ok(HttpResponse::Created().insert_header((header::LOCATION, location)).json(json!({
          "message": "Booking created successfully.",
          "booking": booking
      })))
    }
    FlowOutcome::Stopped => {
      warn!("Booking flow was stopped by a handler.");
      Err(AppError::FlowHalted)
    }
  }
}

#[instrument(name = "handler::delete_booking", skip(app_state, user, path), fields(booking_id = %path.as_ref()))]
pub async fn delete_booking_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let booking = load_visible_booking(&app_state, &user, path.into_inner()).await?;
  if !app_state.repos.bookings.delete(booking.booking.id).await? {
    return Err(AppError::NotFound(format!("Booking with ID {} not found.", booking.booking.id)));
  }
  info!("Booking deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Booking deleted successfully." })))
}

#[instrument(name = "handler::add_booking_product", skip(app_state, user, path))]
pub async fn add_booking_product_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
  let (booking_id, product_id) = path.into_inner();
  load_visible_booking(&app_state, &user, booking_id).await?;
  let booking = app_state
    .repos
    .bookings
    .add_product(booking_id, product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking with ID {} not found.", booking_id)))?;
  info!(%booking_id, %product_id, status = %booking.booking.status, "Product added to booking.");
  Ok(HttpResponse::Ok().json(json!({ "booking": booking })))
}

#[instrument(name = "handler::remove_booking_product", skip(app_state, user, path))]
pub async fn remove_booking_product_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
  let (booking_id, product_id) = path.into_inner();
  load_visible_booking(&app_state, &user, booking_id).await?;
  let booking = app_state
    .repos
    .bookings
    .remove_product(booking_id, product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking with ID {} not found.", booking_id)))?;
  info!(%booking_id, %product_id, status = %booking.booking.status, "Product removed from booking.");
  Ok(HttpResponse::Ok().json(json!({ "booking": booking })))
}
