use std::path::PathBuf;
use axum::{middleware::from_fn, routing::get, Router};
use axum_session::{SessionLayer, SessionStore};
use axum_session_auth::{AuthConfig, AuthSessionLayer};
use axum_session_sqlx::SessionSqlitePool;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod model;
pub mod repo;
pub mod request;
pub mod session;

use model::user::{User, GUEST_ID};
use request::{account, characters};
use session::auth;

#[derive(Clone)]
pub struct AppState {
  pub pool: SqlitePool,
  pub upload_dir: PathBuf,
}

pub fn app(state: AppState, session_store: SessionStore<SessionSqlitePool>) -> Router {
  let config = AuthConfig::<i64>::default().with_anonymous_user_id(Some(GUEST_ID));
  let cors = CorsLayer::permissive();
  Router::new()
    .route("/", get(characters::index).route_layer(from_fn(auth)))
    .route("/register", get(account::register_page).post(account::register))
    .route("/login", get(account::login_page).post(account::login))
    .route("/logout", get(account::logout).route_layer(from_fn(auth)))
    .route("/add", get(characters::add_page).post(characters::add).route_layer(from_fn(auth)))
    .route("/generate", get(characters::generate).route_layer(from_fn(auth)))
    .route("/character/{id}", get(characters::details).route_layer(from_fn(auth)))
    .route("/edit/{id}", get(characters::edit_page).post(characters::edit).route_layer(from_fn(auth)))
    .route("/delete/{id}", get(characters::delete).route_layer(from_fn(auth)))
    .route("/download/{id}", get(characters::download).route_layer(from_fn(auth)))
    .route("/upload", get(characters::upload_page).post(characters::upload).route_layer(from_fn(auth)))
    .layer(cors)
    .layer(AuthSessionLayer::<User, i64, SessionSqlitePool, SqlitePool>::new(Some(state.pool.clone())).with_config(config))
    .layer(SessionLayer::new(session_store))
    .with_state(state)
}
