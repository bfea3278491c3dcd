// vitrine_app/src/web/auth.rs

//! API token authentication. Clients send the token issued at registration or
//! login in `X-AUTH-TOKEN`, or as `Authorization: Bearer <token>`.

use crate::errors::{AppError, Result};
use crate::models::User;
use crate::state::AppState;
use actix_web::http::header;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};
use vitrine::roles::{self, Role};

pub const TOKEN_HEADER: &str = "X-AUTH-TOKEN";

/// The account behind a request's API token, with its effective roles.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
  pub roles: Vec<Role>,
}

impl AuthenticatedUser {
  pub fn has_role(&self, role: Role) -> bool {
    self.roles.contains(&role)
  }

  pub fn require_catalog_manager(&self) -> Result<()> {
    if roles::can_manage_catalog(&self.roles) {
      Ok(())
    } else {
      Err(AppError::Forbidden("Catalog changes require ROLE_ADMIN or ROLE_EMPLOYEE.".to_string()))
    }
  }

  pub fn require_admin(&self) -> Result<()> {
    if self.has_role(Role::Admin) {
      Ok(())
    } else {
      Err(AppError::Forbidden("This action requires ROLE_ADMIN.".to_string()))
    }
  }

  pub fn can_see_all_bookings(&self) -> bool {
    roles::can_see_all_bookings(&self.roles)
  }
}

fn extract_token(req: &HttpRequest) -> Option<String> {
  let from_header = req
    .headers()
    .get(TOKEN_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|t| !t.is_empty());
  if let Some(token) = from_header {
    return Some(token.to_string());
  }
  req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string)
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = extract_token(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();

    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let Some(token) = token else {
        debug!("Request carries no API token.");
        return Err(AppError::Auth("Missing API token.".to_string()));
      };
      let user = match state.repos.users.find_by_token(&token).await? {
        Some(user) => user,
        None => {
          warn!("Request carries an unknown API token.");
          return Err(AppError::Auth("Invalid API token.".to_string()));
        }
      };
      let roles = user.effective_roles();
      Ok(AuthenticatedUser { user, roles })
    })
  }
}
