// vitrine_app/src/flows/mod.rs

//! Request flows registered on the application's `FlowRegistry`.

use crate::errors::AppError;
use vitrine::FlowRegistry;

pub mod booking_flow;
pub mod contexts;
pub mod picture_flow;
pub mod registration_flow;

/// Registers every flow. Called once when the `AppState` is built.
pub fn register_all_flows(registry: &FlowRegistry<AppError>) {
  picture_flow::register_picture_flow(registry);
  registration_flow::register_registration_flow(registry);
  booking_flow::register_booking_flow(registry);
  tracing::info!(flows = registry.len(), "All application flows registered.");
}
