use async_trait::async_trait;
use axum_session_auth::Authentication;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, SqlitePool};
use tracing::info;

use crate::error::AppError;

/// Seeded user id representing the anonymous principal.
pub const GUEST_ID: i64 = 1;

#[derive(Clone, Serialize)]
pub struct User {
  pub id: i64,
  pub anonymous: bool,
  pub username: String,
  pub is_admin: bool,
}

#[derive(FromRow, Debug, Clone)]
pub struct UserRow {
  pub id: i64,
  pub username: String,
  pub password: String,
  pub admin: bool,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub is_admin: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

#[async_trait]
impl Authentication<User, i64, SqlitePool> for User {
  async fn load_user(userid: i64, pool: Option<&SqlitePool>) -> Result<User, anyhow::Error> {
    let pool = pool.ok_or_else(|| anyhow::anyhow!("no pool available for user lookup"))?;
    let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?1")
      .bind(userid).fetch_one(pool).await?;
    Ok(User {
      id: row.id,
      anonymous: row.id == GUEST_ID,
      username: row.username,
      is_admin: row.admin,
    })
  }

  fn is_active(&self) -> bool {
    !self.anonymous
  }

  fn is_anonymous(&self) -> bool {
    self.anonymous
  }

  fn is_authenticated(&self) -> bool {
    !self.anonymous
  }
}

/// Hashes the password and persists a new user. Plaintext never reaches the
/// database.
pub async fn register(pool: &SqlitePool, username: &str, password: &str, is_admin: bool) -> Result<UserRow, AppError> {
  let username = username.trim();
  if username.len() < 3 || username.len() > 100 {
    return Err(AppError::Validation("username must be between 3 and 100 characters".to_string()));
  }
  if password.len() < 6 {
    return Err(AppError::Validation("password must be at least 6 characters long".to_string()));
  }
  let existing: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = ?1")
    .bind(username).fetch_optional(pool).await?;
  if existing.is_some() {
    return Err(AppError::DuplicateUsername(username.to_string()));
  }
  let hash_password = bcrypt::hash(password, 10)?;
  sqlx::query("INSERT INTO users (username, password, admin) VALUES (?1, ?2, ?3)")
    .bind(username).bind(&hash_password).bind(is_admin).execute(pool).await?;
  let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE username = ?1")
    .bind(username).fetch_one(pool).await?;
  info!("user registered: {} {}", row.username, if row.admin { "[admin]" } else { "[user]" });
  Ok(row)
}

/// Username lookup followed by a bcrypt comparison. A missing user and a
/// wrong password are indistinguishable to the caller.
pub async fn verify(pool: &SqlitePool, username: &str, password: &str) -> Result<UserRow, AppError> {
  let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = ?1")
    .bind(username).fetch_optional(pool).await?;
  let Some(row) = row else {
    return Err(AppError::InvalidCredentials);
  };
  if bcrypt::verify(password, &row.password)? {
    Ok(row)
  } else {
    Err(AppError::InvalidCredentials)
  }
}
