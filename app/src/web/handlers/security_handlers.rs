// vitrine_app/src/web/handlers/security_handlers.rs

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::RegistrationCtxData;
use crate::models::{User, UserView};
use crate::repositories::ProfileChanges;
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use vitrine::roles::{self, Role};
use vitrine::{FlowContext, FlowOutcome};

const MAX_NAME_LEN: usize = 64;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
  pub email: String,
  pub password: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  #[serde(default)]
  pub roles: Vec<String>,
}

#[derive(Deserialize)]
pub struct LoginPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountEditPayload {
  pub email: Option<String>,
  pub password: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AssignRolePayload {
  pub email: String,
  pub roles: Vec<String>,
}

/// Body returned by registration and login.
fn session_body(user: &User) -> serde_json::Value {
  let view = UserView::from(user);
  json!({
      "user": view,
      "apiToken": user.api_token,
      "roles": view.roles,
  })
}

#[instrument(
    name = "handler::registration",
    skip(app_state, req_payload),
    fields(req_email = %req_payload.email)
)]
pub async fn registration_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegistrationPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = FlowContext::new(RegistrationCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    first_name: payload.first_name,
    last_name: payload.last_name,
    requested_roles: payload.roles,
    password_hash: None,
    roles_to_store: Vec::new(),
    user: None,
  });

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let user = ctx.read().user.clone();
      let user = user.ok_or_else(|| {
        warn!("Registration flow completed but no user was set in context.");
        AppError::Internal("Registration completed without creating a user.".to_string())
      })?;
      info!(user_id = %user.id, "Registration successful.");
      let location = app_state.config.absolute_url("/api/account/me");
      Ok(HttpResponse::Created().insert_header((header::LOCATION, location)).json(session_body(&user)))
    }
    Ok(FlowOutcome::Stopped) => {
      warn!("Registration flow was stopped by a handler.");
      Err(AppError::FlowHalted)
    }
    Err(app_err) => {
      warn!("Registration failed: {}", app_err);
      Err(app_err)
    }
  }
}

/// Same answer for an unknown email and a wrong password.
#[instrument(name = "handler::login", skip(app_state, req_payload))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let invalid = || AppError::Auth("Invalid credentials.".to_string());
  let email = req_payload.email.trim().to_lowercase();

  let user = app_state.repos.users.find_by_email(&email).await?.ok_or_else(invalid)?;
  if !auth_service::verify_password(&user.password_hash, &req_payload.password)? {
    warn!(user_id = %user.id, "Login rejected: wrong password.");
    return Err(invalid());
  }
  info!(user_id = %user.id, "Login successful.");
  Ok(HttpResponse::Ok().json(session_body(&user)))
}

#[instrument(name = "handler::account_me", skip(user), fields(user_id = %user.user.id))]
pub async fn account_me_handler(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&user.user) })))
}

#[instrument(name = "handler::account_edit", skip(app_state, user, req_payload), fields(user_id = %user.user.id))]
pub async fn account_edit_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<AccountEditPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();

  let email = match payload.email {
    Some(raw) => {
      let email = raw.trim().to_lowercase();
      let valid = matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && !domain.is_empty());
      if !valid {
        return Err(AppError::Validation("A valid email address is required.".to_string()));
      }
      Some(email)
    }
    None => None,
  };
  for name in [&payload.first_name, &payload.last_name].into_iter().flatten() {
    if name.chars().count() > MAX_NAME_LEN {
      return Err(AppError::Validation(format!("Names must be at most {} characters.", MAX_NAME_LEN)));
    }
  }
  let password_hash = payload.password.as_deref().map(auth_service::hash_password).transpose()?;

  let changes = ProfileChanges {
    email,
    password_hash,
    first_name: payload.first_name,
    last_name: payload.last_name,
  };
  let updated = app_state
    .repos
    .users
    .update_profile(user.user.id, changes)
    .await?
    .ok_or_else(|| AppError::NotFound("Account no longer exists.".to_string()))?;
  info!("Account updated.");
  Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&updated) })))
}

#[instrument(name = "handler::assign_role", skip(app_state, user, req_payload), fields(target_email = %req_payload.email))]
pub async fn assign_role_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<AssignRolePayload>,
) -> Result<HttpResponse, AppError> {
  user.require_admin()?;
  let email = req_payload.email.trim().to_lowercase();
  let target = app_state
    .repos
    .users
    .find_by_email(&email)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No user with email {}.", email)))?;

  let next = roles::apply_assignment(&target.stored_roles(), &req_payload.roles)?;
  let updated = app_state
    .repos
    .users
    .set_roles(target.id, roles::to_strings(&next))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No user with email {}.", email)))?;
  info!(target_id = %updated.id, roles = ?updated.roles, "Roles assigned.");
  Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&updated) })))
}

#[instrument(name = "handler::list_users", skip(app_state, user))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  user.require_admin()?;
  let users: Vec<UserView> = app_state.repos.users.list().await?.iter().map(UserView::from).collect();
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

/// Grants `ROLE_ADMIN` to a user. Callers may claim it for themselves; an
/// admin may grant it to anyone, which only succeeds while nobody holds it.
#[instrument(name = "handler::claim_admin", skip(app_state, user, path), fields(target_id = %path.as_ref()))]
pub async fn claim_admin_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let target_id = path.into_inner();
  if target_id != user.user.id && !user.has_role(Role::Admin) {
    return Err(AppError::Forbidden("Only the account owner can claim the admin role.".to_string()));
  }
  let target = app_state
    .repos
    .users
    .get(target_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User with ID {} not found.", target_id)))?;
  if target.is_admin() {
    return Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&target) })));
  }

  let mut next = target.stored_roles();
  next.push(Role::Admin);
  // A second admin trips the store's uniqueness rule and comes back as 403.
  let updated = app_state
    .repos
    .users
    .set_roles(target.id, roles::to_strings(&next))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User with ID {} not found.", target_id)))?;
  info!("Admin role granted.");
  Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&updated) })))
}

#[instrument(name = "handler::delete_user", skip(app_state, user, path), fields(target_id = %path.as_ref()))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  user.require_admin()?;
  let target_id = path.into_inner();
  if !app_state.repos.users.delete(target_id).await? {
    return Err(AppError::NotFound(format!("User with ID {} not found.", target_id)));
  }
  info!("User deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully." })))
}
