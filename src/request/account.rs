use axum::{
  extract::State,
  response::{IntoResponse, Redirect, Response},
  Form, Json,
};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::model::user::{self, LoginRequest, RegisterRequest};
use crate::session::{flash, Auth};
use crate::AppState;

pub async fn register_page(auth: Auth) -> Response {
  if auth.is_authenticated() {
    return Redirect::to("/").into_response();
  }
  Json(json!({
    "fields": {
      "username": "3 to 100 characters",
      "password": "at least 6 characters",
      "is_admin": "optional flag",
    }
  })).into_response()
}

pub async fn register(
  auth: Auth,
  State(state): State<AppState>,
  Form(req): Form<RegisterRequest>,
) -> Result<Response, AppError> {
  if auth.is_authenticated() {
    return Ok(Redirect::to("/").into_response());
  }
  user::register(&state.pool, &req.username, &req.password, req.is_admin).await?;
  flash(&auth, "Account created successfully! You can now log in.");
  Ok(Redirect::to("/login").into_response())
}

pub async fn login_page(auth: Auth) -> Response {
  if auth.is_authenticated() {
    return Redirect::to("/").into_response();
  }
  Json(json!({ "fields": { "username": "", "password": "" } })).into_response()
}

pub async fn login(
  auth: Auth,
  State(state): State<AppState>,
  Form(req): Form<LoginRequest>,
) -> Result<Response, AppError> {
  if auth.is_authenticated() {
    return Ok(Redirect::to("/").into_response());
  }
  let row = user::verify(&state.pool, &req.username, &req.password).await?;
  auth.login_user(row.id);
  info!("{} logged in", row.username);
  Ok(Redirect::to("/").into_response())
}

pub async fn logout(auth: Auth) -> Response {
  auth.logout_user();
  info!("user logged out");
  flash(&auth, "You have been logged out.");
  Redirect::to("/login").into_response()
}
