// vitrine_app/src/web/mod.rs

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use routes::{configure_app_routes, json_config, path_config};
