use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::Multipart;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::error::AppError;

pub const RACES: [&str; 4] = ["Human", "Elf", "Dwarf", "Halfling"];

pub const CLASSES: [&str; 12] = [
  "Barbarian", "Bard", "Cleric", "Druid", "Fighter", "Monk",
  "Paladin", "Ranger", "Rogue", "Sorcerer", "Warlock", "Wizard",
];

/// The fixed skill vocabulary: form field key to display label, in checkbox
/// order. The stored skills string is rebuilt from this table only.
pub const SKILLS: [(&str, &str); 18] = [
  ("acrobatics", "Acrobatics"),
  ("animal_handling", "Animal Handling"),
  ("arcana", "Arcana"),
  ("athletics", "Athletics"),
  ("deception", "Deception"),
  ("history", "History"),
  ("insight", "Insight"),
  ("intimidation", "Intimidation"),
  ("investigation", "Investigation"),
  ("medicine", "Medicine"),
  ("nature", "Nature"),
  ("perception", "Perception"),
  ("performance", "Performance"),
  ("persuasion", "Persuasion"),
  ("religion", "Religion"),
  ("sleight_of_hand", "Sleight of Hand"),
  ("stealth", "Stealth"),
  ("survival", "Survival"),
];

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Character {
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
  pub image_path: Option<String>,
}

/// Field set for insert and full-overwrite update; the repository assigns
/// the identifier.
#[derive(Clone, Debug, Default)]
pub struct NewCharacter {
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
  pub image_path: Option<String>,
}

pub struct ImageUpload {
  pub filename: String,
  pub bytes: Bytes,
}

/// A submitted character form, decoded from multipart form data. Skill
/// checkboxes count as checked when the field is present at all.
pub struct CharacterForm {
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
  pub checked: HashSet<String>,
  pub description: Option<String>,
  pub image: Option<ImageUpload>,
}

fn int_field(text: &mut HashMap<String, String>, key: &str) -> Result<i64, AppError> {
  let raw = text.remove(key)
    .ok_or_else(|| AppError::Validation(format!("{} is required", key)))?;
  raw.trim().parse()
    .map_err(|_| AppError::Validation(format!("{} must be an integer", key)))
}

impl CharacterForm {
  pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
    let mut text: HashMap<String, String> = HashMap::new();
    let mut checked: HashSet<String> = HashSet::new();
    let mut image: Option<ImageUpload> = None;
    while let Some(field) = multipart.next_field().await? {
      let Some(name) = field.name().map(str::to_string) else {
        continue;
      };
      if name == "image" {
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if !filename.is_empty() && !bytes.is_empty() {
          image = Some(ImageUpload { filename, bytes });
        }
      } else if SKILLS.iter().any(|(key, _)| *key == name) {
        let _ = field.text().await?;
        checked.insert(name);
      } else {
        let value = field.text().await?;
        text.insert(name, value);
      }
    }
    Ok(Self {
      name: text.remove("name").unwrap_or_default(),
      race: text.remove("race").unwrap_or_default(),
      character_class: text.remove("character_class").unwrap_or_default(),
      level: int_field(&mut text, "level")?,
      experience: int_field(&mut text, "experience")?,
      strength: int_field(&mut text, "strength")?,
      dexterity: int_field(&mut text, "dexterity")?,
      constitution: int_field(&mut text, "constitution")?,
      intelligence: int_field(&mut text, "intelligence")?,
      wisdom: int_field(&mut text, "wisdom")?,
      charisma: int_field(&mut text, "charisma")?,
      max_hp: int_field(&mut text, "max_hp")?,
      current_hp: int_field(&mut text, "current_hp")?,
      checked,
      description: text.remove("description").filter(|s| !s.trim().is_empty()),
      image,
    })
  }

  /// Form-level validation, applied to create and edit submissions only;
  /// the import path bypasses it.
  pub fn validate(&self) -> Result<(), AppError> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation("name is required".to_string()));
    }
    if !RACES.contains(&self.race.as_str()) {
      return Err(AppError::Validation(format!("unknown race: {}", self.race)));
    }
    if !CLASSES.contains(&self.character_class.as_str()) {
      return Err(AppError::Validation(format!("unknown class: {}", self.character_class)));
    }
    if !(1..=20).contains(&self.level) {
      return Err(AppError::Validation("level must be between 1 and 20".to_string()));
    }
    if self.experience < 0 {
      return Err(AppError::Validation("experience must not be negative".to_string()));
    }
    let abilities = [
      ("strength", self.strength),
      ("dexterity", self.dexterity),
      ("constitution", self.constitution),
      ("intelligence", self.intelligence),
      ("wisdom", self.wisdom),
      ("charisma", self.charisma),
    ];
    for (label, value) in abilities {
      if !(8..=20).contains(&value) {
        return Err(AppError::Validation(format!("{} must be between 8 and 20", label)));
      }
    }
    if self.max_hp < 1 {
      return Err(AppError::Validation("max_hp must be positive".to_string()));
    }
    // current_hp <= max_hp is only informally expected, never rejected.
    if self.current_hp < 0 {
      return Err(AppError::Validation("current_hp must not be negative".to_string()));
    }
    Ok(())
  }

  /// Checked skills joined to a single string, in vocabulary order.
  pub fn skills_string(&self) -> String {
    SKILLS.iter()
      .filter(|(key, _)| self.checked.contains(*key))
      .map(|(_, label)| *label)
      .collect::<Vec<_>>()
      .join(", ")
  }

  pub fn new_character(&self, image_path: Option<String>) -> NewCharacter {
    NewCharacter {
      name: self.name.trim().to_string(),
      race: self.race.clone(),
      character_class: self.character_class.clone(),
      level: self.level,
      experience: self.experience,
      strength: self.strength,
      dexterity: self.dexterity,
      constitution: self.constitution,
      intelligence: self.intelligence,
      wisdom: self.wisdom,
      charisma: self.charisma,
      max_hp: self.max_hp,
      current_hp: self.current_hp,
      skills: self.skills_string(),
      description: self.description.clone(),
      image_path,
    }
  }
}

/// Maps a stored skills string back to the checkbox keys it was built from.
/// Labels that fall outside the vocabulary are dropped.
pub fn skill_keys(skills: &str) -> Vec<String> {
  skills.split(", ")
    .filter_map(|label| {
      SKILLS.iter()
        .find(|(_, l)| *l == label)
        .map(|(key, _)| key.to_string())
    })
    .collect()
}
