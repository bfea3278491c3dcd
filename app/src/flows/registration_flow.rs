// vitrine_app/src/flows/registration_flow.rs

use crate::errors::AppError;
use crate::flows::contexts::RegistrationCtxData;
use crate::repositories::NewUser;
use crate::services::auth_service;
use tracing::{event, info, warn, Level};
use vitrine::roles::Role;
use vitrine::{Flow, FlowContext, FlowControl, FlowRegistry};

const MAX_NAME_LEN: usize = 64;

pub fn register_registration_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<RegistrationCtxData, AppError>::new(&[
    ("validate_input", false, None),
    ("hash_password", false, None),
    ("create_user", false, None),
  ]);

  flow.on("validate_input", |ctx: FlowContext<RegistrationCtxData>| async move {
    let mut guard = ctx.write();
    let email = guard.email.trim().to_lowercase();
    guard.email = email.clone();
    event!(Level::DEBUG, email = %email, "Validating registration input.");

    let valid_email = matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && !domain.is_empty());
    if !valid_email {
      warn!("Invalid email format provided for registration.");
      return Err(AppError::Validation("A valid email address is required.".to_string()));
    }
    if guard.password.chars().count() < auth_service::MIN_PASSWORD_LEN {
      return Err(AppError::Validation(format!(
        "Password must be at least {} characters long.",
        auth_service::MIN_PASSWORD_LEN
      )));
    }
    for name in [&guard.first_name, &guard.last_name].into_iter().flatten() {
      if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
          "Names must be at most {} characters.",
          MAX_NAME_LEN
        )));
      }
    }

    // Only the admin role can be claimed at registration; staff roles are
    // handed out later by the admin.
    let wants_admin = guard.requested_roles.iter().any(|r| r.trim() == Role::Admin.as_str());
    let ignored: Vec<&String> = guard
      .requested_roles
      .iter()
      .filter(|r| r.trim() != Role::Admin.as_str() && r.trim() != Role::User.as_str())
      .collect();
    if !ignored.is_empty() {
      warn!(?ignored, "Ignoring roles requested at registration.");
    }
    guard.roles_to_store = if wants_admin {
      vec![Role::Admin.as_str().to_string()]
    } else {
      Vec::new()
    };
    Ok::<_, AppError>(FlowControl::Continue)
  });

  flow.on("hash_password", |ctx: FlowContext<RegistrationCtxData>| async move {
    let password = ctx.read().password.clone();
    let hash = auth_service::hash_password(&password)?;
    let mut guard = ctx.write();
    guard.password_hash = Some(hash);
    guard.password.clear();
    Ok::<_, AppError>(FlowControl::Continue)
  });

  flow.on("create_user", |ctx: FlowContext<RegistrationCtxData>| async move {
    let (new_user, repos) = {
      let guard = ctx.read();
      let password_hash = guard
        .password_hash
        .clone()
        .ok_or_else(|| AppError::Internal("Password was not hashed before user creation.".to_string()))?;
      (
        NewUser {
          email: guard.email.clone(),
          password_hash,
          roles: guard.roles_to_store.clone(),
          api_token: auth_service::generate_api_token(),
          first_name: guard.first_name.clone(),
          last_name: guard.last_name.clone(),
        },
        guard.app_state.repos.clone(),
      )
    };

    // Email uniqueness and the single-admin rule are enforced by the store.
    let user = repos.users.create(new_user).await?;
    info!(user_id = %user.id, admin = user.is_admin(), "User registered.");
    ctx.write().user = Some(user);
    Ok::<_, AppError>(FlowControl::Continue)
  });

  registry.register(flow);
  tracing::info!("Registration flow registered.");
}
