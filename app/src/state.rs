// vitrine_app/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::repositories::Repositories;
use std::sync::Arc;
use vitrine::{FlowRegistry, UploadPolicy, UploadStore};

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub repos: Repositories,
  pub uploads: Arc<UploadStore>,
  pub upload_policy: Arc<UploadPolicy>,
}

impl AppState {
  /// Builds the state and registers every request flow on it.
  pub fn new(config: Arc<AppConfig>, repos: Repositories) -> Self {
    let uploads = UploadStore::new(config.upload_dir.clone(), config.upload_public_prefix.clone());
    let state = Self {
      upload_policy: Arc::new(config.upload_policy()),
      uploads: Arc::new(uploads),
      flows: Arc::new(FlowRegistry::new()),
      repos,
      config,
    };
    crate::flows::register_all_flows(&state.flows);
    state
  }
}
