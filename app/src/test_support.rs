// vitrine_app/src/test_support.rs

//! An application backed by the in-memory store and a temporary upload
//! directory, for handler tests.

use crate::config::AppConfig;
use crate::models::{ProductDetails, User};
use crate::repositories::memory::MemoryStore;
use crate::repositories::{NewProduct, NewUser, Repositories};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::{configure_app_routes, json_config, path_config};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const PNG_BYTES: &[u8] = &[
  0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00,
  0x01,
];

pub const TEST_PASSWORD: &str = "correct horse battery";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
});

pub struct TestApp {
  pub state: AppState,
  pub store: MemoryStore,
  upload_dir: TempDir,
}

impl TestApp {
  pub async fn new() -> Self {
    Self::with_max_bytes(5 * 1024 * 1024).await
  }

  pub async fn with_max_bytes(upload_max_bytes: u64) -> Self {
    Self::build(upload_max_bytes, |_, _| {}).await
  }

  /// Same as `new`, but lets a test swap individual repositories, e.g. for
  /// one that fails on purpose.
  pub async fn with_repositories(customize: impl FnOnce(&MemoryStore, &mut Repositories)) -> Self {
    Self::build(5 * 1024 * 1024, customize).await
  }

  async fn build(upload_max_bytes: u64, customize: impl FnOnce(&MemoryStore, &mut Repositories)) -> Self {
    Lazy::force(&TRACING);
    let upload_dir = tempfile::tempdir().expect("temp upload dir");
    let config = AppConfig {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: "postgres://unused".to_string(),
      database_max_connections: 1,
      app_base_url: "http://localhost:8080".to_string(),
      upload_dir: upload_dir.path().join("pictures"),
      upload_public_prefix: "/uploads/pictures".to_string(),
      upload_max_bytes,
      run_migrations: false,
    };
    let store = MemoryStore::new();
    let mut repos = store.repositories();
    customize(&store, &mut repos);
    let state = AppState::new(Arc::new(config), repos);
    state.uploads.ensure_root().await.expect("upload root");
    Self { state, store, upload_dir }
  }

  pub fn app(
    &self,
  ) -> App<
    impl ServiceFactory<ServiceRequest, Config = (), Response = ServiceResponse, Error = actix_web::Error, InitError = ()>,
  > {
    let prefix = self.state.config.upload_public_prefix.clone();
    App::new()
      .app_data(web::Data::new(self.state.clone()))
      .app_data(json_config())
      .app_data(path_config())
      .configure(move |cfg| configure_app_routes(cfg, &prefix))
  }

  pub fn upload_path(&self, stored_name: &str) -> PathBuf {
    self.upload_dir.path().join("pictures").join(stored_name)
  }

  pub fn stored_file_count(&self) -> usize {
    std::fs::read_dir(self.upload_dir.path().join("pictures"))
      .expect("read upload dir")
      .count()
  }

  /// Inserts an account directly and returns it with its API token.
  pub async fn create_user(&self, email: &str, roles: &[&str]) -> (User, String) {
    let token = auth_service::generate_api_token();
    let user = self
      .state
      .repos
      .users
      .create(NewUser {
        email: email.to_string(),
        password_hash: auth_service::hash_password(TEST_PASSWORD).expect("hash"),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        api_token: token.clone(),
        first_name: None,
        last_name: None,
      })
      .await
      .expect("create user");
    (user, token)
  }

  pub async fn create_product(&self, title: &str, available: bool) -> ProductDetails {
    self
      .state
      .repos
      .products
      .create(NewProduct {
        title: title.to_string(),
        description: String::new(),
        price_cents: 1_000,
        available,
        picture_id: None,
        category_ids: Vec::new(),
      })
      .await
      .expect("create product")
  }
}

/// A single-file multipart body and its content type.
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
  let boundary = "vitrine-test-boundary";
  let mut body = Vec::new();
  body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
  body.extend_from_slice(
    format!(
      "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
      field, file_name, content_type
    )
    .as_bytes(),
  );
  body.extend_from_slice(bytes);
  body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
  body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\nUploaded");
  body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
  (format!("multipart/form-data; boundary={}", boundary), body)
}
