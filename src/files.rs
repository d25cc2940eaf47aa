use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

pub fn allowed_image(filename: &str) -> bool {
  match filename.rsplit_once('.') {
    Some((_, ext)) => ALLOWED_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
    None => false,
  }
}

/// Reduces a client-supplied filename to a safe storage path segment: the
/// last path component, leading dots stripped, everything outside
/// alphanumerics, dot, dash and underscore replaced.
pub fn sanitize_filename(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
  let base = base.trim_start_matches('.');
  base.chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect()
}

/// Overwrite-by-filename write into the upload directory, created on demand.
pub async fn save_upload(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
  tokio::fs::create_dir_all(dir).await?;
  let path = dir.join(filename);
  tokio::fs::write(&path, bytes).await?;
  Ok(path)
}
