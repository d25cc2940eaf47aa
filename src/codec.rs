use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::files::sanitize_filename;
use crate::model::character::{Character, NewCharacter};

/// Every key an uploaded document must carry. Extra keys are ignored.
pub const REQUIRED_KEYS: [&str; 16] = [
  "id", "name", "race", "character_class", "level", "experience",
  "strength", "dexterity", "constitution", "intelligence", "wisdom", "charisma",
  "max_hp", "current_hp", "skills", "description",
];

/// The portable character sheet: a flat field map of everything except
/// image_path.
#[derive(Serialize, Deserialize)]
pub struct CharacterDoc {
  pub id: i64,
  pub name: String,
  pub race: String,
  pub character_class: String,
  pub level: i64,
  pub experience: i64,
  pub strength: i64,
  pub dexterity: i64,
  pub constitution: i64,
  pub intelligence: i64,
  pub wisdom: i64,
  pub charisma: i64,
  pub max_hp: i64,
  pub current_hp: i64,
  pub skills: String,
  pub description: Option<String>,
}

impl From<&Character> for CharacterDoc {
  fn from(c: &Character) -> Self {
    Self {
      id: c.id,
      name: c.name.clone(),
      race: c.race.clone(),
      character_class: c.character_class.clone(),
      level: c.level,
      experience: c.experience,
      strength: c.strength,
      dexterity: c.dexterity,
      constitution: c.constitution,
      intelligence: c.intelligence,
      wisdom: c.wisdom,
      charisma: c.charisma,
      max_hp: c.max_hp,
      current_hp: c.current_hp,
      skills: c.skills.clone(),
      description: c.description.clone(),
    }
  }
}

pub fn export(character: &Character) -> Result<String, AppError> {
  Ok(serde_json::to_string_pretty(&CharacterDoc::from(character))?)
}

/// Attachment name derived from the character's name.
pub fn export_filename(name: &str) -> String {
  format!("{}.json", sanitize_filename(&name.replace(' ', "_")))
}

/// Parses an uploaded document into a persistable character. Field values
/// are taken verbatim; the importer runs no range validation, and the
/// document's own id is discarded in favor of a freshly assigned one.
pub fn import(data: &[u8]) -> Result<NewCharacter, AppError> {
  let value: Value = serde_json::from_slice(data)
    .map_err(|e| AppError::InvalidFormat(format!("invalid JSON: {}", e)))?;
  let map = value.as_object()
    .ok_or_else(|| AppError::InvalidFormat("document must be a JSON object".to_string()))?;
  let missing: Vec<&str> = REQUIRED_KEYS.iter()
    .filter(|key| !map.contains_key(**key))
    .copied()
    .collect();
  if !missing.is_empty() {
    return Err(AppError::InvalidFormat(format!("missing required keys: {}", missing.join(", "))));
  }
  let doc: CharacterDoc = serde_json::from_value(value)
    .map_err(|e| AppError::InvalidFormat(format!("bad field value: {}", e)))?;
  Ok(NewCharacter {
    name: doc.name,
    race: doc.race,
    character_class: doc.character_class,
    level: doc.level,
    experience: doc.experience,
    strength: doc.strength,
    dexterity: doc.dexterity,
    constitution: doc.constitution,
    intelligence: doc.intelligence,
    wisdom: doc.wisdom,
    charisma: doc.charisma,
    max_hp: doc.max_hp,
    current_hp: doc.current_hp,
    skills: doc.skills,
    description: doc.description,
    image_path: None,
  })
}
