// vitrine_app/src/web/handlers/mod.rs

pub mod booking_handlers;
pub mod category_handlers;
pub mod picture_handlers;
pub mod product_handlers;
pub mod security_handlers;
