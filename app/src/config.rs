// vitrine_app/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use vitrine::UploadPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub app_base_url: String,

  /// Directory picture files are written to.
  pub upload_dir: PathBuf,
  /// URL path prefix under which `upload_dir` is served.
  pub upload_public_prefix: String,
  pub upload_max_bytes: u64,

  pub run_migrations: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let database_max_connections = get_env("DATABASE_MAX_CONNECTIONS")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let upload_dir = PathBuf::from(get_env("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads/pictures".to_string()));
    let upload_public_prefix = get_env("UPLOAD_PUBLIC_PREFIX").unwrap_or_else(|_| "/uploads/pictures".to_string());
    if !upload_public_prefix.starts_with('/') {
      return Err(AppError::Config(format!(
        "UPLOAD_PUBLIC_PREFIX must start with '/': {}",
        upload_public_prefix
      )));
    }
    let upload_max_bytes = get_env("UPLOAD_MAX_BYTES")
      .unwrap_or_else(|_| UploadPolicy::DEFAULT_MAX_FILE_SIZE_BYTES.to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid UPLOAD_MAX_BYTES: {}", e)))?;
    if upload_max_bytes == 0 {
      return Err(AppError::Config("UPLOAD_MAX_BYTES must be greater than zero".to_string()));
    }

    let run_migrations = get_env("RUN_MIGRATIONS")
      .unwrap_or_else(|_| "true".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATIONS value: {}", e)))?;

    tracing::info!(
      upload_dir = %upload_dir.display(),
      upload_max_bytes,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      app_base_url,
      upload_dir,
      upload_public_prefix,
      upload_max_bytes,
      run_migrations,
    })
  }

  pub fn upload_policy(&self) -> UploadPolicy {
    UploadPolicy::new(self.upload_max_bytes)
  }

  /// Absolute URL for a path on this server, used for `Location` headers.
  pub fn absolute_url(&self, path: &str) -> String {
    format!("{}{}", self.app_base_url.trim_end_matches('/'), path)
  }
}
