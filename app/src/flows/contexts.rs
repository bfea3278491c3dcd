// vitrine_app/src/flows/contexts.rs

//! Data carried through each request flow. Handlers receive these wrapped in
//! `vitrine::FlowContext`.

use crate::models::{BookingDetails, Picture, User};
use crate::state::AppState;
use uuid::Uuid;
use vitrine::{StoredFile, UploadSource, ValidatedImage};

/// Whether a picture flow creates a new picture or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureTarget {
  New,
  Existing(Uuid),
}

#[derive(Clone)]
pub struct PictureCtxData {
  pub app_state: AppState,
  pub target: PictureTarget,
  /// Absent on an edit that only changes title or slug.
  pub source: Option<UploadSource>,
  pub title: Option<String>,
  pub slug: Option<String>,

  pub existing: Option<Picture>,
  pub validated: Option<ValidatedImage>,
  pub stored: Option<StoredFile>,
  pub picture: Option<Picture>,
  /// Stored name of the file an edit replaced, removed once the row points elsewhere.
  pub replaced_image_path: Option<String>,
}

impl PictureCtxData {
  pub fn new(app_state: AppState, target: PictureTarget) -> Self {
    Self {
      app_state,
      target,
      source: None,
      title: None,
      slug: None,
      existing: None,
      validated: None,
      stored: None,
      picture: None,
      replaced_image_path: None,
    }
  }
}

#[derive(Clone)]
pub struct RegistrationCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub requested_roles: Vec<String>,

  pub password_hash: Option<String>,
  pub roles_to_store: Vec<String>,
  pub user: Option<User>,
}

#[derive(Clone)]
pub struct BookingCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub quantity: i32,
  pub product_ids: Vec<Uuid>,

  pub booking: Option<BookingDetails>,
}
