use rand::Rng;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::error::AppError;
use crate::model::character::{Character, NewCharacter, CLASSES, RACES};

/// Skill pool used by the random generator; a deliberate subset of the full
/// vocabulary.
const GENERATOR_SKILLS: [&str; 5] = ["Acrobatics", "Stealth", "Persuasion", "Athletics", "Survival"];

/// Optional, AND-combined filters plus sort order for the roster listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub name: Option<String>,
  pub race: Option<String>,
  pub character_class: Option<String>,
  pub level: Option<String>,
  pub sort_by: Option<String>,
  pub order: Option<String>,
}

impl ListParams {
  // Lenient on purpose: a non-numeric or zero level means no filter.
  fn level_filter(&self) -> Option<i64> {
    self.level.as_deref()
      .and_then(|s| s.trim().parse::<i64>().ok())
      .filter(|level| *level != 0)
  }
}

pub async fn list(pool: &SqlitePool, params: &ListParams) -> Result<Vec<Character>, AppError> {
  let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM characters WHERE 1=1");
  if let Some(name) = params.name.as_deref().filter(|s| !s.is_empty()) {
    // SQLite LIKE is case-insensitive for ASCII.
    query.push(" AND name LIKE ").push_bind(format!("%{}%", name));
  }
  if let Some(race) = params.race.as_deref().filter(|s| !s.is_empty()) {
    query.push(" AND race = ").push_bind(race.to_string());
  }
  if let Some(class) = params.character_class.as_deref().filter(|s| !s.is_empty()) {
    query.push(" AND character_class = ").push_bind(class.to_string());
  }
  if let Some(level) = params.level_filter() {
    query.push(" AND level = ").push_bind(level);
  }
  // Unrecognized sort_by values fall back to name ordering.
  let column = match params.sort_by.as_deref() {
    Some("level") => "level",
    Some("experience") => "experience",
    _ => "name",
  };
  let direction = match params.order.as_deref() {
    Some("desc") => "DESC",
    _ => "ASC",
  };
  query.push(format!(" ORDER BY {} {}", column, direction));
  let characters = query.build_query_as::<Character>().fetch_all(pool).await?;
  Ok(characters)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Character, AppError> {
  sqlx::query_as("SELECT * FROM characters WHERE id = ?1")
    .bind(id)
    .fetch_optional(pool).await?
    .ok_or(AppError::NotFound)
}

pub async fn create(pool: &SqlitePool, c: &NewCharacter) -> Result<Character, AppError> {
  let result = sqlx::query("
    INSERT INTO characters
      (name, race, character_class, level, experience,
       strength, dexterity, constitution, intelligence, wisdom, charisma,
       max_hp, current_hp, skills, description, image_path)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
  ")
    .bind(&c.name).bind(&c.race).bind(&c.character_class)
    .bind(c.level).bind(c.experience)
    .bind(c.strength).bind(c.dexterity).bind(c.constitution)
    .bind(c.intelligence).bind(c.wisdom).bind(c.charisma)
    .bind(c.max_hp).bind(c.current_hp)
    .bind(&c.skills).bind(&c.description).bind(&c.image_path)
    .execute(pool).await?;
  get(pool, result.last_insert_rowid()).await
}

/// Full overwrite, except image_path which only changes when a new image was
/// supplied with the submission.
pub async fn update(pool: &SqlitePool, id: i64, c: &NewCharacter) -> Result<Character, AppError> {
  let result = sqlx::query("
    UPDATE characters SET
      name = ?1, race = ?2, character_class = ?3, level = ?4, experience = ?5,
      strength = ?6, dexterity = ?7, constitution = ?8, intelligence = ?9,
      wisdom = ?10, charisma = ?11, max_hp = ?12, current_hp = ?13,
      skills = ?14, description = ?15,
      image_path = COALESCE(?16, image_path)
    WHERE id = ?17
  ")
    .bind(&c.name).bind(&c.race).bind(&c.character_class)
    .bind(c.level).bind(c.experience)
    .bind(c.strength).bind(c.dexterity).bind(c.constitution)
    .bind(c.intelligence).bind(c.wisdom).bind(c.charisma)
    .bind(c.max_hp).bind(c.current_hp)
    .bind(&c.skills).bind(&c.description).bind(&c.image_path)
    .bind(id)
    .execute(pool).await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound);
  }
  get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
  let result = sqlx::query("DELETE FROM characters WHERE id = ?1")
    .bind(id).execute(pool).await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound);
  }
  Ok(())
}

/// Rolls and persists a random character. Ability scores come from the
/// narrower [8,18] generator range, which form validation also accepts.
pub async fn generate_random(pool: &SqlitePool) -> Result<Character, AppError> {
  let rolled = {
    let mut rng = rand::rng();
    let mut pick = |options: &[&str]| options[rng.random_range(0..options.len())].to_string();
    let race = pick(&RACES);
    let character_class = pick(&CLASSES);
    let skills = (0..3)
      .map(|_| pick(&GENERATOR_SKILLS))
      .collect::<Vec<_>>()
      .join(", ");
    let max_hp = rng.random_range(10..=100);
    NewCharacter {
      name: format!("Random {}", race),
      race,
      character_class,
      level: rng.random_range(1..=20),
      experience: rng.random_range(0..=10000),
      strength: rng.random_range(8..=18),
      dexterity: rng.random_range(8..=18),
      constitution: rng.random_range(8..=18),
      intelligence: rng.random_range(8..=18),
      wisdom: rng.random_range(8..=18),
      charisma: rng.random_range(8..=18),
      max_hp,
      current_hp: rng.random_range(1..=max_hp),
      skills,
      description: Some("Generated character with random attributes.".to_string()),
      image_path: None,
    }
  };
  let character = create(pool, &rolled).await?;
  info!("generated character: {} ({})", character.name, character.id);
  Ok(character)
}
