// vitrine_app/src/models/mod.rs

//! Database rows and the JSON views built from them.

pub mod booking;
pub mod category;
pub mod picture;
pub mod product;
pub mod user;

pub use booking::{Booking, BookingDetails};
pub use category::Category;
pub use picture::Picture;
pub use product::{Product, ProductDetails};
pub use user::{User, UserView};
