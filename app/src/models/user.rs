// vitrine_app/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use vitrine::roles::{self, Role};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  pub password_hash: String,
  /// Stored roles. `ROLE_USER` is implied and never stored.
  pub roles: Vec<String>,
  pub api_token: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn stored_roles(&self) -> Vec<Role> {
    roles::parse_stored(&self.roles)
  }

  pub fn effective_roles(&self) -> Vec<Role> {
    roles::effective(&self.stored_roles())
  }

  pub fn is_admin(&self) -> bool {
    self.stored_roles().contains(&Role::Admin)
  }
}

/// What clients get to see of an account. Never carries the hash or the token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
  pub id: Uuid,
  pub email: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub roles: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
  fn from(user: &User) -> Self {
    Self {
      id: user.id,
      email: user.email.clone(),
      first_name: user.first_name.clone(),
      last_name: user.last_name.clone(),
      roles: roles::to_strings(&user.effective_roles()),
      created_at: user.created_at,
      updated_at: user.updated_at,
    }
  }
}
