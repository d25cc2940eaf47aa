use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use roster_server::model::character::NewCharacter;
use roster_server::{app, db, repo, session, AppState};

struct TestApp {
  app: Router,
  pool: SqlitePool,
  _upload_dir: TempDir,
}

async fn test_app() -> TestApp {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:").await.unwrap();
  db::setup(&pool).await.unwrap();
  let store = session::session_store(pool.clone()).await.unwrap();
  let upload_dir = tempfile::tempdir().unwrap();
  let state = AppState { pool: pool.clone(), upload_dir: upload_dir.path().to_path_buf() };
  TestApp { app: app(state, store), pool, _upload_dir: upload_dir }
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
  app.clone().oneshot(req).await.unwrap()
}

fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
  let mut builder = Request::builder().uri(uri);
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  builder.body(Body::empty()).unwrap()
}

fn form_req(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
  let mut builder = Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  builder.body(Body::from(body.to_string())).unwrap()
}

const BOUNDARY: &str = "X-ROSTER-TEST-BOUNDARY";

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &str)>) -> String {
  let mut body = String::new();
  for (name, value) in fields {
    body.push_str(&format!(
      "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
      BOUNDARY, name, value
    ));
  }
  if let Some((name, filename, content)) = file {
    body.push_str(&format!(
      "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/json\r\n\r\n{}\r\n",
      BOUNDARY, name, filename, content
    ));
  }
  body.push_str(&format!("--{}--\r\n", BOUNDARY));
  body
}

fn multipart_req(uri: &str, body: String, cookie: &str) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
    .header(header::COOKIE, cookie)
    .body(Body::from(body))
    .unwrap()
}

fn cookies_from(res: &Response<Body>) -> String {
  res.headers()
    .get_all(header::SET_COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .filter_map(|v| v.split(';').next())
    .collect::<Vec<_>>()
    .join("; ")
}

fn location(res: &Response<Body>) -> &str {
  res.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

async fn body_string(res: Response<Body>) -> String {
  let bytes = res.into_body().collect().await.unwrap().to_bytes();
  String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_and_login(app: &Router, username: &str, password: &str, is_admin: bool) -> String {
  let body = format!("username={}&password={}&is_admin={}", username, password, is_admin);
  let res = send(app, form_req("/register", &body, None)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);

  let body = format!("username={}&password={}", username, password);
  let res = send(app, form_req("/login", &body, None)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/");
  let cookie = cookies_from(&res);
  assert!(!cookie.is_empty(), "login should establish a session cookie");
  cookie
}

async fn character_count(pool: &SqlitePool) -> i64 {
  sqlx::query_scalar("SELECT COUNT(*) FROM characters").fetch_one(pool).await.unwrap()
}

fn thorin_fields() -> Vec<(&'static str, &'static str)> {
  vec![
    ("name", "Thorin"),
    ("race", "Dwarf"),
    ("character_class", "Fighter"),
    ("level", "5"),
    ("experience", "6500"),
    ("strength", "12"),
    ("dexterity", "12"),
    ("constitution", "12"),
    ("intelligence", "12"),
    ("wisdom", "12"),
    ("charisma", "12"),
    ("max_hp", "40"),
    ("current_hp", "40"),
  ]
}

#[tokio::test]
async fn anonymous_requests_are_redirected_to_login() {
  let t = test_app().await;
  let res = send(&t.app, get_req("/", None)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn authenticated_user_sees_the_listing() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "alice", "secret1", false).await;
  let res = send(&t.app, get_req("/", Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::OK);
  let body = body_string(res).await;
  assert!(body.contains("characters"));
}

#[tokio::test]
async fn non_numeric_level_query_is_ignored_not_rejected() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "alice", "secret1", false).await;
  repo::create(&t.pool, &seeded_character()).await.unwrap();

  let res = send(&t.app, get_req("/?level=abc", Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::OK);
  let body = body_string(res).await;
  assert!(body.contains("Borin"));
}

fn seeded_character() -> NewCharacter {
  NewCharacter {
    name: "Borin".to_string(),
    race: "Dwarf".to_string(),
    character_class: "Cleric".to_string(),
    level: 3,
    experience: 900,
    strength: 10,
    dexterity: 10,
    constitution: 10,
    intelligence: 10,
    wisdom: 10,
    charisma: 10,
    max_hp: 25,
    current_hp: 25,
    skills: "Religion".to_string(),
    description: None,
    image_path: None,
  }
}

#[tokio::test]
async fn non_admin_mutations_never_touch_the_table() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "alice", "secret1", false).await;

  // One pre-existing row so edit and delete have a real target.
  let seeded = repo::create(&t.pool, &seeded_character()).await.unwrap();

  let res = send(&t.app, multipart_req("/add", multipart_body(&thorin_fields(), None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/");

  let res = send(&t.app, get_req("/generate", Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/");

  let doc = r#"{"id":1,"name":"X","race":"Elf","character_class":"Bard","level":1,"experience":0,"strength":8,"dexterity":8,"constitution":8,"intelligence":8,"wisdom":8,"charisma":8,"max_hp":10,"current_hp":10,"skills":"","description":null}"#;
  let res = send(&t.app, multipart_req("/upload", multipart_body(&[], Some(("file", "x.json", doc))), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);

  let mut fields = thorin_fields();
  fields[0] = ("name", "Renamed");
  let res = send(&t.app, multipart_req(&format!("/edit/{}", seeded.id), multipart_body(&fields, None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/");

  let res = send(&t.app, get_req(&format!("/delete/{}", seeded.id), Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);

  // Still exactly the seeded row, with every field untouched.
  assert_eq!(character_count(&t.pool).await, 1);
  let row = repo::get(&t.pool, seeded.id).await.unwrap();
  assert_eq!(row.name, "Borin");
  assert_eq!(row.level, 3);
  assert_eq!(row.skills, "Religion");

  // The warning notice lands on the next listing.
  let res = send(&t.app, get_req("/", Some(&cookie))).await;
  let body = body_string(res).await;
  assert!(body.contains("Only admins"));
}

#[tokio::test]
async fn admin_creates_a_character_from_the_form() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;

  let res = send(&t.app, multipart_req("/add", multipart_body(&thorin_fields(), None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/");
  assert_eq!(character_count(&t.pool).await, 1);

  let id: i64 = sqlx::query_scalar("SELECT id FROM characters").fetch_one(&t.pool).await.unwrap();
  let res = send(&t.app, get_req(&format!("/character/{}", id), Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::OK);
  let body = body_string(res).await;
  let value: serde_json::Value = serde_json::from_str(&body).unwrap();
  assert_eq!(value["name"], "Thorin");
  assert_eq!(value["race"], "Dwarf");
  assert_eq!(value["character_class"], "Fighter");
  assert_eq!(value["level"], 5);
  assert_eq!(value["max_hp"], 40);
  assert_eq!(value["current_hp"], 40);
  // no skill boxes checked
  assert_eq!(value["skills"], "");
}

#[tokio::test]
async fn checked_skill_boxes_become_the_skills_string() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;

  let mut fields = thorin_fields();
  fields.push(("stealth", "y"));
  fields.push(("athletics", "y"));
  let res = send(&t.app, multipart_req("/add", multipart_body(&fields, None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);

  let skills: String = sqlx::query_scalar("SELECT skills FROM characters").fetch_one(&t.pool).await.unwrap();
  assert_eq!(skills, "Athletics, Stealth");
}

#[tokio::test]
async fn out_of_range_form_is_rejected_and_nothing_persists() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;

  let mut fields = thorin_fields();
  fields[3] = ("level", "25");
  let res = send(&t.app, multipart_req("/add", multipart_body(&fields, None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);

  let mut fields = thorin_fields();
  fields[9] = ("wisdom", "7");
  let res = send(&t.app, multipart_req("/add", multipart_body(&fields, None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);

  assert_eq!(character_count(&t.pool).await, 0);
}

#[tokio::test]
async fn generate_creates_a_persisted_character() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;
  let res = send(&t.app, get_req("/generate", Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(character_count(&t.pool).await, 1);
  let name: String = sqlx::query_scalar("SELECT name FROM characters").fetch_one(&t.pool).await.unwrap();
  assert!(name.starts_with("Random "));
}

#[tokio::test]
async fn download_then_upload_round_trips_a_character() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;

  send(&t.app, multipart_req("/add", multipart_body(&thorin_fields(), None), &cookie)).await;
  let id: i64 = sqlx::query_scalar("SELECT id FROM characters").fetch_one(&t.pool).await.unwrap();

  let res = send(&t.app, get_req(&format!("/download/{}", id), Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::OK);
  let disposition = res.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap().to_string();
  assert!(disposition.contains("attachment"));
  assert!(disposition.contains("Thorin.json"));
  let document = body_string(res).await;

  let res = send(&t.app, multipart_req("/upload", multipart_body(&[], Some(("file", "thorin.json", &document))), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(character_count(&t.pool).await, 2);

  let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM characters ORDER BY id").fetch_all(&t.pool).await.unwrap();
  assert_ne!(ids[0], ids[1]);
  let names: Vec<String> = sqlx::query_scalar("SELECT name FROM characters").fetch_all(&t.pool).await.unwrap();
  assert_eq!(names, ["Thorin", "Thorin"]);
}

#[tokio::test]
async fn upload_missing_required_key_is_refused() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;

  // no "wisdom" key
  let doc = r#"{"id":1,"name":"X","race":"Elf","character_class":"Bard","level":1,"experience":0,"strength":8,"dexterity":8,"constitution":8,"intelligence":8,"charisma":8,"max_hp":10,"current_hp":10,"skills":"","description":null}"#;
  let res = send(&t.app, multipart_req("/upload", multipart_body(&[], Some(("file", "x.json", doc))), &cookie)).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  let body = body_string(res).await;
  assert!(body.contains("wisdom"));
  assert_eq!(character_count(&t.pool).await, 0);
}

#[tokio::test]
async fn upload_requires_a_json_file() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;
  let res = send(&t.app, multipart_req("/upload", multipart_body(&[], Some(("file", "x.txt", "{}"))), &cookie)).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  assert_eq!(character_count(&t.pool).await, 0);
}

#[tokio::test]
async fn details_of_missing_character_is_not_found() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "alice", "secret1", false).await;
  let res = send(&t.app, get_req("/character/999", Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
  let t = test_app().await;
  let body = "username=alice&password=secret1&is_admin=false";
  let res = send(&t.app, form_req("/register", body, None)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  let res = send(&t.app, form_req("/register", body, None)).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  let msg = body_string(res).await;
  assert!(msg.contains("alice"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let t = test_app().await;
  let res = send(&t.app, form_req("/register", "username=alice&password=secret1&is_admin=false", None)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  let res = send(&t.app, form_req("/login", "username=alice&password=wrong11", None)).await;
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_edits_overwrite_and_delete_removes() {
  let t = test_app().await;
  let cookie = register_and_login(&t.app, "admin1", "secret1", true).await;

  send(&t.app, multipart_req("/add", multipart_body(&thorin_fields(), None), &cookie)).await;
  let id: i64 = sqlx::query_scalar("SELECT id FROM characters").fetch_one(&t.pool).await.unwrap();

  let mut fields = thorin_fields();
  fields[0] = ("name", "Thorin Oakenshield");
  fields[3] = ("level", "6");
  let res = send(&t.app, multipart_req(&format!("/edit/{}", id), multipart_body(&fields, None), &cookie)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);

  let name: String = sqlx::query_scalar("SELECT name FROM characters WHERE id = ?1")
    .bind(id).fetch_one(&t.pool).await.unwrap();
  assert_eq!(name, "Thorin Oakenshield");

  let res = send(&t.app, get_req(&format!("/delete/{}", id), Some(&cookie))).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(character_count(&t.pool).await, 0);
}
