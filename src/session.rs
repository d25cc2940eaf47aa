use axum::{extract::Request, middleware::Next, response::{IntoResponse, Redirect, Response}};
use axum_session::{Key, SessionConfig, SessionStore};
use axum_session_auth::AuthSession;
use axum_session_sqlx::SessionSqlitePool;
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::warn;

use crate::error::AppError;
use crate::model::user::User;

pub type Auth = AuthSession<User, i64, SessionSqlitePool, SqlitePool>;

const FLASH_KEY: &str = "flash";

pub async fn session_store(pool: Pool<Sqlite>) -> anyhow::Result<SessionStore<SessionSqlitePool>> {
  let config = SessionConfig::default()
    .with_table_name("session_table")
    .with_key(Key::generate());
  let store = SessionStore::<SessionSqlitePool>::new(Some(pool.into()), config).await?;
  Ok(store)
}

/// Gate for protected routes: anonymous principals are sent to the login
/// page, everyone else gets the loaded user attached to the request.
pub async fn auth(auth: Auth, mut req: Request, next: Next) -> Response {
  if auth.is_authenticated() {
    if let Some(user) = auth.current_user.clone() {
      req.extensions_mut().insert(user);
      return next.run(req).await;
    }
  }
  warn!("unauthenticated request to {}", req.uri().path());
  Redirect::to("/login").into_response()
}

/// Mutating character operations are admin-only. Refusal leaves a warning
/// notice for the listing page and short-circuits the handler before any
/// repository call.
pub fn require_admin(auth: &Auth, user: &User, action: &str) -> Result<(), AppError> {
  if user.is_admin {
    Ok(())
  } else {
    warn!("{} denied: {} is not an admin", action, user.username);
    flash(auth, &format!("Only admins can {}.", action));
    Err(AppError::Forbidden)
  }
}

/// One-shot notice shown on the next roster listing.
pub fn flash(auth: &Auth, message: &str) {
  auth.session.set(FLASH_KEY, message.to_string());
}

pub fn take_flash(auth: &Auth) -> Option<String> {
  let message = auth.session.get::<String>(FLASH_KEY);
  if message.is_some() {
    auth.session.remove(FLASH_KEY);
  }
  message
}
