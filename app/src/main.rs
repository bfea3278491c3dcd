// vitrine_app/src/main.rs

mod config;
mod errors;
mod flows;
mod models;
mod repositories;
mod services;
mod state;
mod web;

#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::repositories::Repositories;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting vitrine server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(io::Error::other(e.to_string()));
    }
  };

  let db_pool = match PgPoolOptions::new()
    .max_connections(app_config.database_max_connections)
    .connect(&app_config.database_url)
    .await
  {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(io::Error::other(e.to_string()));
    }
  };

  if app_config.run_migrations {
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
      tracing::error!(error = %e, "Database migrations failed.");
      return Err(io::Error::other(e.to_string()));
    }
    tracing::info!("Database migrations applied.");
  }

  let app_state = AppState::new(app_config.clone(), Repositories::postgres(db_pool));
  if let Err(e) = app_state.uploads.ensure_root().await {
    tracing::error!(error = %e, upload_dir = %app_config.upload_dir.display(), "Upload directory is not usable.");
    return Err(io::Error::other(e.to_string()));
  }

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  let upload_prefix = app_config.upload_public_prefix.clone();
  HttpServer::new(move || {
    let upload_prefix = upload_prefix.clone();
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(web::json_config())
      .app_data(web::path_config())
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(move |cfg| web::configure_app_routes(cfg, &upload_prefix))
  })
  .bind(&server_address)?
  .run()
  .await
}
