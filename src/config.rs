use std::env;
use std::path::PathBuf;

/// Runtime settings, read once at startup. Every variable has a default so
/// the server runs with no environment at all.
#[derive(Clone, Debug)]
pub struct Config {
  pub bind_addr: String,
  pub database_url: String,
  pub upload_dir: PathBuf,
}

impl Config {
  pub fn from_env() -> Self {
    Self {
      bind_addr: env::var("ROSTER_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
      database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://db.sqlite?mode=rwc".to_string()),
      upload_dir: env::var("ROSTER_UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".to_string()).into(),
    }
  }
}
