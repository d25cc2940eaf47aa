use axum::{
  extract::{Multipart, Path, Query, State},
  http::header,
  response::{IntoResponse, Redirect, Response},
  Extension, Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::codec;
use crate::error::AppError;
use crate::files;
use crate::model::character::{skill_keys, Character, CharacterForm, ImageUpload, CLASSES, RACES, SKILLS};
use crate::model::user::User;
use crate::repo::{self, ListParams};
use crate::session::{flash, require_admin, take_flash, Auth};
use crate::AppState;

#[derive(Serialize)]
pub struct RosterView {
  pub notice: Option<String>,
  pub characters: Vec<Character>,
}

pub async fn index(
  auth: Auth,
  State(state): State<AppState>,
  Query(params): Query<ListParams>,
) -> Result<Json<RosterView>, AppError> {
  let characters = repo::list(&state.pool, &params).await?;
  Ok(Json(RosterView { notice: take_flash(&auth), characters }))
}

pub async fn details(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Json<Character>, AppError> {
  let character = repo::get(&state.pool, id).await?;
  Ok(Json(character))
}

fn vocabularies() -> serde_json::Value {
  json!({
    "races": RACES,
    "classes": CLASSES,
    "skills": SKILLS.iter().map(|(key, label)| json!({ "key": key, "label": label })).collect::<Vec<_>>(),
  })
}

/// Validates and stores an uploaded portrait, returning the path to persist.
async fn store_image(state: &AppState, image: Option<&ImageUpload>) -> Result<Option<String>, AppError> {
  let Some(image) = image else {
    return Ok(None);
  };
  if !files::allowed_image(&image.filename) {
    return Err(AppError::Validation("only image files are allowed (png, jpg, jpeg, gif)".to_string()));
  }
  let filename = files::sanitize_filename(&image.filename);
  files::save_upload(&state.upload_dir, &filename, &image.bytes).await?;
  Ok(Some(format!("uploads/{}", filename)))
}

pub async fn add_page(auth: Auth, Extension(user): Extension<User>) -> Result<Response, AppError> {
  require_admin(&auth, &user, "create characters")?;
  Ok(Json(vocabularies()).into_response())
}

pub async fn add(
  auth: Auth,
  Extension(user): Extension<User>,
  State(state): State<AppState>,
  multipart: Multipart,
) -> Result<Response, AppError> {
  require_admin(&auth, &user, "create characters")?;
  let form = CharacterForm::from_multipart(multipart).await?;
  form.validate()?;
  let image_path = store_image(&state, form.image.as_ref()).await?;
  let character = repo::create(&state.pool, &form.new_character(image_path)).await?;
  info!("character added: {} ({})", character.name, character.id);
  flash(&auth, "Character added successfully!");
  Ok(Redirect::to("/").into_response())
}

pub async fn generate(
  auth: Auth,
  Extension(user): Extension<User>,
  State(state): State<AppState>,
) -> Result<Response, AppError> {
  require_admin(&auth, &user, "generate characters")?;
  repo::generate_random(&state.pool).await?;
  flash(&auth, "Random character generated!");
  Ok(Redirect::to("/").into_response())
}

pub async fn edit_page(
  auth: Auth,
  Extension(user): Extension<User>,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Response, AppError> {
  require_admin(&auth, &user, "edit characters")?;
  let character = repo::get(&state.pool, id).await?;
  let checked = skill_keys(&character.skills);
  Ok(Json(json!({
    "character": character,
    "checked_skills": checked,
    "vocabularies": vocabularies(),
  })).into_response())
}

pub async fn edit(
  auth: Auth,
  Extension(user): Extension<User>,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  multipart: Multipart,
) -> Result<Response, AppError> {
  require_admin(&auth, &user, "edit characters")?;
  let form = CharacterForm::from_multipart(multipart).await?;
  form.validate()?;
  let image_path = store_image(&state, form.image.as_ref()).await?;
  let character = repo::update(&state.pool, id, &form.new_character(image_path)).await?;
  info!("character updated: {} ({})", character.name, character.id);
  flash(&auth, "Character updated successfully!");
  Ok(Redirect::to("/").into_response())
}

pub async fn delete(
  auth: Auth,
  Extension(user): Extension<User>,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Response, AppError> {
  require_admin(&auth, &user, "delete characters")?;
  repo::delete(&state.pool, id).await?;
  info!("character deleted: {}", id);
  flash(&auth, "Character deleted.");
  Ok(Redirect::to("/").into_response())
}

pub async fn download(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Response, AppError> {
  let character = repo::get(&state.pool, id).await?;
  let document = codec::export(&character)?;
  let filename = codec::export_filename(&character.name);
  // Transient server-side copy, same overwrite semantics as image uploads.
  files::save_upload(&state.upload_dir, &filename, document.as_bytes()).await?;
  let headers = [
    (header::CONTENT_TYPE, "application/json".to_string()),
    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
  ];
  Ok((headers, document).into_response())
}

pub async fn upload_page(auth: Auth, Extension(user): Extension<User>) -> Result<Response, AppError> {
  require_admin(&auth, &user, "upload characters")?;
  Ok(Json(json!({
    "file": "a .json character document",
    "required_keys": codec::REQUIRED_KEYS,
  })).into_response())
}

pub async fn upload(
  auth: Auth,
  Extension(user): Extension<User>,
  State(state): State<AppState>,
  mut multipart: Multipart,
) -> Result<Response, AppError> {
  require_admin(&auth, &user, "upload characters")?;
  let mut payload = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some("file") {
      let filename = field.file_name().unwrap_or_default().to_string();
      let bytes = field.bytes().await?;
      payload = Some((filename, bytes));
    }
  }
  let Some((filename, bytes)) = payload else {
    return Err(AppError::InvalidFormat("no file part in the request".to_string()));
  };
  if filename.is_empty() {
    return Err(AppError::InvalidFormat("no file selected".to_string()));
  }
  if !filename.ends_with(".json") {
    return Err(AppError::InvalidFormat("please upload a .json file".to_string()));
  }
  let imported = codec::import(&bytes)?;
  let character = repo::create(&state.pool, &imported).await?;
  info!("character uploaded: {} ({})", character.name, character.id);
  flash(&auth, "Character uploaded successfully!");
  Ok(Redirect::to("/").into_response())
}
