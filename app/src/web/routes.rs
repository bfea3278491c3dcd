// vitrine_app/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{booking_handlers, category_handlers, picture_handlers, product_handlers, security_handlers};
use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed JSON bodies answer with the application's 400 body.
pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(format!("Invalid JSON payload: {}", err)).into())
}

/// An id that does not parse cannot name an existing entity.
pub fn path_config() -> web::PathConfig {
  web::PathConfig::default().error_handler(|err, _req| AppError::NotFound(format!("Invalid path parameter: {}", err)).into())
}

/// Mounts every route. `upload_prefix` is the public URL prefix of stored pictures.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig, upload_prefix: &str) {
  cfg
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/api")
        .service(
          web::scope("/products")
            .route("", web::get().to(product_handlers::list_products_handler))
            .route("", web::post().to(product_handlers::create_product_handler))
            .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
            .route("/{product_id}", web::put().to(product_handlers::update_product_handler))
            .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler)),
        )
        .service(
          web::scope("/category")
            .route("", web::get().to(category_handlers::list_categories_handler))
            .route("", web::post().to(category_handlers::create_category_handler))
            .route("/{category_id}", web::get().to(category_handlers::get_category_handler))
            .route("/{category_id}", web::put().to(category_handlers::update_category_handler))
            .route("/{category_id}", web::delete().to(category_handlers::delete_category_handler)),
        )
        .service(
          web::scope("/booking")
            .route("", web::get().to(booking_handlers::list_bookings_handler))
            .route("", web::post().to(booking_handlers::create_booking_handler))
            .route("/{booking_id}", web::get().to(booking_handlers::get_booking_handler))
            .route("/{booking_id}", web::delete().to(booking_handlers::delete_booking_handler))
            .route(
              "/{booking_id}/products/{product_id}",
              web::post().to(booking_handlers::add_booking_product_handler),
            )
            .route(
              "/{booking_id}/products/{product_id}",
              web::delete().to(booking_handlers::remove_booking_product_handler),
            ),
        )
        .service(
          web::scope("/pictures")
            .route("/new", web::post().to(picture_handlers::create_picture_handler))
            .route("/{picture_id}", web::get().to(picture_handlers::show_picture_handler))
            .route("/{picture_id}", web::put().to(picture_handlers::update_picture_handler))
            .route("/{picture_id}", web::delete().to(picture_handlers::delete_picture_handler)),
        )
        .route("/registration", web::post().to(security_handlers::registration_handler))
        .route("/login", web::post().to(security_handlers::login_handler))
        .route("/account/me", web::get().to(security_handlers::account_me_handler))
        .route("/account/edit", web::put().to(security_handlers::account_edit_handler))
        .route("/assign-role", web::put().to(security_handlers::assign_role_handler))
        .service(
          web::scope("/users")
            .route("", web::get().to(security_handlers::list_users_handler))
            .route("/{user_id}/admin", web::post().to(security_handlers::claim_admin_handler))
            .route("/{user_id}", web::delete().to(security_handlers::delete_user_handler)),
        ),
    )
    .route(
      &format!("{}/{{filename}}", upload_prefix.trim_end_matches('/')),
      web::get().to(picture_handlers::serve_upload_handler),
    );
}
