use sqlx::{Executor, Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::error::AppError;
use crate::model::user::UserRow;

pub async fn connect(database_url: &str) -> anyhow::Result<Pool<Sqlite>> {
  let pool = SqlitePool::connect(database_url).await?;
  setup(&pool).await?;
  Ok(pool)
}

pub async fn setup(pool: &Pool<Sqlite>) -> Result<(), AppError> {
  add_users_table(pool).await?;
  add_characters_table(pool).await?;
  init_users(pool).await?;
  Ok(())
}

async fn add_users_table(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
  pool.execute("
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      username TEXT NOT NULL UNIQUE,
      password TEXT NOT NULL,
      admin BOOL DEFAULT FALSE
    )
  ").await?;
  Ok(())
}

async fn add_characters_table(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
  pool.execute("
    CREATE TABLE IF NOT EXISTS characters (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      race TEXT NOT NULL,
      character_class TEXT NOT NULL,
      level INTEGER NOT NULL,
      experience INTEGER NOT NULL,
      strength INTEGER NOT NULL,
      dexterity INTEGER NOT NULL,
      constitution INTEGER NOT NULL,
      intelligence INTEGER NOT NULL,
      wisdom INTEGER NOT NULL,
      charisma INTEGER NOT NULL,
      max_hp INTEGER NOT NULL,
      current_hp INTEGER NOT NULL,
      skills TEXT NOT NULL,
      description TEXT,
      image_path TEXT
    )
  ").await?;
  Ok(())
}

// Row 1 is the guest account serving as the anonymous principal, so it must
// exist before the first request. A default admin is seeded alongside it.
async fn init_users(pool: &Pool<Sqlite>) -> Result<(), AppError> {
  let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?1")
    .bind(1_i64).fetch_all(pool).await?;
  if rows.is_empty() {
    sqlx::query("INSERT INTO users (username, password, admin) VALUES (?1, ?2, ?3)")
      .bind("guest").bind("").bind(false).execute(pool).await?;
    let hash_password = bcrypt::hash("arrakis", 10)?;
    sqlx::query("INSERT INTO users (username, password, admin) VALUES (?1, ?2, ?3)")
      .bind("admin").bind(&hash_password).bind(true).execute(pool).await?;
    info!("seeded guest and admin accounts");
  }
  Ok(())
}
