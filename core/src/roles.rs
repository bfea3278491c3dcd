// vitrine/src/roles.rs

//! User roles and the rules for who may hold or grant them.
//!
//! `ROLE_USER` is implied for every account and is never stored. At most one
//! account holds `ROLE_ADMIN`; that limit is enforced by the database, not here.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
  User,
  Employee,
  Moderator,
  Admin,
}

impl Role {
  /// Roles an admin may hand out through role assignment.
  pub const ASSIGNABLE: [Role; 2] = [Role::Employee, Role::Moderator];

  pub fn as_str(self) -> &'static str {
    match self {
      Role::User => "ROLE_USER",
      Role::Employee => "ROLE_EMPLOYEE",
      Role::Moderator => "ROLE_MODERATOR",
      Role::Admin => "ROLE_ADMIN",
    }
  }

  pub fn is_assignable(self) -> bool {
    Self::ASSIGNABLE.contains(&self)
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
  #[error("Unknown role '{0}'")]
  Unknown(String),
  #[error("Role '{0}' cannot be assigned")]
  NotAssignable(Role),
  #[error("At least one role must be provided")]
  NoRoles,
}

impl FromStr for Role {
  type Err = RoleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "ROLE_USER" => Ok(Role::User),
      "ROLE_EMPLOYEE" => Ok(Role::Employee),
      "ROLE_MODERATOR" => Ok(Role::Moderator),
      "ROLE_ADMIN" => Ok(Role::Admin),
      other => Err(RoleError::Unknown(other.to_string())),
    }
  }
}

/// Parses stored role strings, silently dropping any this build does not know.
pub fn parse_stored(stored: &[String]) -> Vec<Role> {
  let mut roles: Vec<Role> = stored.iter().filter_map(|r| r.parse().ok()).filter(|r| *r != Role::User).collect();
  roles.sort();
  roles.dedup();
  roles
}

/// Roles as reported to clients: the stored ones plus the implicit `ROLE_USER`.
pub fn effective(stored: &[Role]) -> Vec<Role> {
  let mut roles = Vec::with_capacity(stored.len() + 1);
  roles.push(Role::User);
  roles.extend(stored.iter().copied().filter(|r| *r != Role::User));
  roles.sort();
  roles.dedup();
  roles
}

pub fn to_strings(roles: &[Role]) -> Vec<String> {
  roles.iter().map(|r| r.as_str().to_string()).collect()
}

/// Catalog writes are open to admins and employees.
pub fn can_manage_catalog(roles: &[Role]) -> bool {
  roles.iter().any(|r| matches!(r, Role::Admin | Role::Employee))
}

/// Bookings of other users are visible to admins, employees and moderators.
pub fn can_see_all_bookings(roles: &[Role]) -> bool {
  roles.iter().any(|r| matches!(r, Role::Admin | Role::Employee | Role::Moderator))
}

/// Computes the roles to store after an assignment request. Only assignable
/// roles are accepted; an admin role already held is kept.
pub fn apply_assignment(current: &[Role], requested: &[String]) -> Result<Vec<Role>, RoleError> {
  if requested.is_empty() {
    return Err(RoleError::NoRoles);
  }
  let mut next = Vec::with_capacity(requested.len() + 1);
  for raw in requested {
    let role: Role = raw.parse()?;
    if !role.is_assignable() {
      return Err(RoleError::NotAssignable(role));
    }
    next.push(role);
  }
  if current.contains(&Role::Admin) {
    next.push(Role::Admin);
  }
  next.sort();
  next.dedup();
  Ok(next)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn parses_and_prints_roles() {
    assert_eq!("ROLE_ADMIN".parse::<Role>(), Ok(Role::Admin));
    assert_eq!(Role::Moderator.to_string(), "ROLE_MODERATOR");
    assert_eq!("ROLE_ROOT".parse::<Role>(), Err(RoleError::Unknown("ROLE_ROOT".into())));
  }

  #[test]
  fn stored_roles_never_include_user() {
    let roles = parse_stored(&strings(&["ROLE_USER", "ROLE_EMPLOYEE", "ROLE_EMPLOYEE", "bogus"]));
    assert_eq!(roles, vec![Role::Employee]);
    assert_eq!(effective(&roles), vec![Role::User, Role::Employee]);
  }

  #[test]
  fn assignment_accepts_only_employee_and_moderator() {
    assert_eq!(
      apply_assignment(&[], &strings(&["ROLE_MODERATOR", "ROLE_EMPLOYEE"])),
      Ok(vec![Role::Employee, Role::Moderator])
    );
    assert_eq!(
      apply_assignment(&[], &strings(&["ROLE_ADMIN"])),
      Err(RoleError::NotAssignable(Role::Admin))
    );
    assert_eq!(
      apply_assignment(&[], &strings(&["ROLE_USER"])),
      Err(RoleError::NotAssignable(Role::User))
    );
    assert_eq!(apply_assignment(&[], &[]), Err(RoleError::NoRoles));
  }

  #[test]
  fn assignment_keeps_existing_admin() {
    let next = apply_assignment(&[Role::Admin, Role::Moderator], &strings(&["ROLE_EMPLOYEE"])).unwrap();
    assert_eq!(next, vec![Role::Employee, Role::Admin]);
  }

  #[test]
  fn permission_checks() {
    assert!(can_manage_catalog(&[Role::Employee]));
    assert!(!can_manage_catalog(&[Role::Moderator]));
    assert!(can_see_all_bookings(&[Role::Moderator]));
    assert!(!can_see_all_bookings(&[Role::User]));
  }
}
