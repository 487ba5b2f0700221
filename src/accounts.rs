//! Users, roles and caller identity.
//!
//! Credentials are verified upstream. Requests reach this service with an
//! `X-User-Id` header naming an existing, active user; `Caller` resolves it.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument, warn};

use crate::domain::{Role, User};
use crate::error::ApiError;
use crate::protocol::{ProfileUpdateIn, RegisterIn};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

const USER_COLUMNS: &str =
  "id, email, username, first_name, last_name, role, age, onboarding_completed, is_active, date_joined";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    id: row.get(0)?,
    email: row.get(1)?,
    username: row.get(2)?,
    first_name: row.get(3)?,
    last_name: row.get(4)?,
    role: row.get(5)?,
    age: row.get(6)?,
    onboarding_completed: row.get(7)?,
    is_active: row.get(8)?,
    date_joined: row.get(9)?,
  })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, ApiError> {
  let sql = format!("SELECT {USER_COLUMNS} FROM accounts_user WHERE id = ?1");
  Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

/// Display name used in nested outputs; empty when the user no longer exists.
pub fn full_name_of(conn: &Connection, id: i64) -> Result<String, ApiError> {
  Ok(get_user(conn, id)?.map(|u| u.full_name()).unwrap_or_default())
}

fn validate_age(age: Option<u32>) -> Result<(), ApiError> {
  match age {
    Some(a) if !(13..=23).contains(&a) => Err(ApiError::bad_request("Age must be between 13-23 for this platform")),
    _ => Ok(()),
  }
}

#[instrument(level = "info", skip(conn, input), fields(username = %input.username))]
pub fn register_user(conn: &Connection, input: &RegisterIn) -> Result<User, ApiError> {
  let email = input.email.trim().to_lowercase();
  let username = input.username.trim();
  if !email.contains('@') {
    return Err(ApiError::bad_request("Enter a valid email address."));
  }
  if username.is_empty() {
    return Err(ApiError::bad_request("Username is required."));
  }
  validate_age(input.age)?;
  let role = input.role.unwrap_or(Role::User);
  if role == Role::Admin {
    return Err(ApiError::bad_request("Administrators cannot self-register."));
  }

  let taken: bool = conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM accounts_user WHERE email = ?1 OR username = ?2)",
    params![email, username],
    |row| row.get(0),
  )?;
  if taken {
    return Err(ApiError::bad_request("An account with this email or username already exists."));
  }

  conn.execute(
    "INSERT INTO accounts_user (email, username, first_name, last_name, role, age, date_joined)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![email, username, input.first_name.trim(), input.last_name.trim(), role, input.age, Utc::now()],
  )?;
  let id = conn.last_insert_rowid();
  info!(target: "accounts", id, %role, "User registered");
  get_user(conn, id)?.ok_or_else(|| ApiError::internal("registered user vanished"))
}

pub fn update_profile(conn: &Connection, id: i64, patch: &ProfileUpdateIn) -> Result<User, ApiError> {
  validate_age(patch.age)?;
  conn.execute(
    "UPDATE accounts_user SET
       first_name = COALESCE(?2, first_name),
       last_name = COALESCE(?3, last_name),
       age = COALESCE(?4, age)
     WHERE id = ?1",
    params![id, patch.first_name, patch.last_name, patch.age],
  )?;
  get_user(conn, id)?.ok_or_else(|| ApiError::not_found("User not found"))
}

pub fn complete_onboarding(conn: &Connection, id: i64) -> Result<User, ApiError> {
  conn.execute("UPDATE accounts_user SET onboarding_completed = 1 WHERE id = ?1", [id])?;
  get_user(conn, id)?.ok_or_else(|| ApiError::not_found("User not found"))
}

//
// Permission checks
//

const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

pub fn require_onboarded(user: &User) -> Result<(), ApiError> {
  if user.onboarding_completed { Ok(()) } else { Err(ApiError::forbidden(PERMISSION_DENIED)) }
}

pub fn require_admin(user: &User) -> Result<(), ApiError> {
  if user.role == Role::Admin { Ok(()) } else { Err(ApiError::admin_required()) }
}

pub fn require_guide(user: &User, msg: &str) -> Result<(), ApiError> {
  if user.role == Role::Guide { Ok(()) } else { Err(ApiError::forbidden(msg)) }
}

pub fn require_staff(user: &User) -> Result<(), ApiError> {
  if user.role.is_staff_role() { Ok(()) } else { Err(ApiError::forbidden("Permission denied")) }
}

/// The authenticated user behind the current request.
pub struct Caller(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<i64>().ok())
      .ok_or(ApiError::Unauthorized)?;

    match state.run(move |conn| get_user(conn, id)).await? {
      Some(u) if u.is_active => Ok(Caller(u)),
      _ => {
        warn!(target: "accounts", id, "Rejected request for unknown or inactive user");
        Err(ApiError::Unauthorized)
      }
    }
  }
}
