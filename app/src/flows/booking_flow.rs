// vitrine_app/src/flows/booking_flow.rs

use crate::errors::AppError;
use crate::flows::contexts::BookingCtxData;
use crate::repositories::NewBooking;
use tracing::info;
use vitrine::{Flow, FlowContext, FlowControl, FlowRegistry};

pub fn register_booking_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<BookingCtxData, AppError>::new(&[("validate_input", false, None), ("create_booking", false, None)]);

  flow.on("validate_input", |ctx: FlowContext<BookingCtxData>| async move {
    let mut guard = ctx.write();
    if guard.quantity <= 0 {
      return Err(AppError::Validation("Booking quantity must be greater than zero.".to_string()));
    }
    guard.product_ids.sort();
    guard.product_ids.dedup();
    Ok::<_, AppError>(FlowControl::Continue)
  });

  // Inserting the booking, linking its products and deriving its status
  // happen in one repository call.
  flow.on("create_booking", |ctx: FlowContext<BookingCtxData>| async move {
    let (new_booking, repos) = {
      let guard = ctx.read();
      (
        NewBooking {
          user_id: guard.user_id,
          quantity: guard.quantity,
          product_ids: guard.product_ids.clone(),
        },
        guard.app_state.repos.clone(),
      )
    };
    let booking = repos.bookings.create(new_booking).await?;
    info!(booking_id = %booking.booking.id, status = %booking.booking.status, "Booking created.");
    ctx.write().booking = Some(booking);
    Ok::<_, AppError>(FlowControl::Continue)
  });

  registry.register(flow);
  tracing::info!("Booking flow registered.");
}
