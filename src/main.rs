use anyhow::Result;
use tracing_subscriber::EnvFilter;

use roster_server::{app, config::Config, db, session, AppState};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .init();
  let config = Config::from_env();
  let name = env!("CARGO_PKG_NAME");
  let version = env!("CARGO_PKG_VERSION");
  println!();
  println!("{}", name.to_uppercase());
  println!("ver. {}", version);
  println!();
  println!("running on {}", config.bind_addr);
  println!();
  let pool = db::connect(&config.database_url).await?;
  let session_store = session::session_store(pool.clone()).await?;
  let state = AppState { pool, upload_dir: config.upload_dir.clone() };
  let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
  axum::serve(listener, app(state, session_store)).await?;
  Ok(())
}
