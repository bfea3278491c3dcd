// vitrine/src/upload/store.rs

//! Filesystem storage for validated pictures, confined to a single directory.

use crate::upload::error::UploadError;
use crate::upload::kind::ImageKind;
use crate::upload::validate::ValidatedImage;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// A picture that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
  pub stored_name: String,
  pub public_url: String,
  pub kind: ImageKind,
  pub size: u64,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
  root: PathBuf,
  public_prefix: String,
}

impl UploadStore {
  pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
    let prefix = public_prefix.into();
    Self {
      root: root.into(),
      public_prefix: prefix.trim_end_matches('/').to_string(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// URL path under which a stored file is served, e.g. `/uploads/pictures/<name>`.
  pub fn public_url(&self, stored_name: &str) -> String {
    format!("{}/{}", self.public_prefix, stored_name)
  }

  pub async fn ensure_root(&self) -> Result<(), UploadError> {
    tokio::fs::create_dir_all(&self.root).await?;
    Ok(())
  }

  /// Writes the image under a fresh name. The bytes land in a `.part` file first
  /// and are renamed into place once fully flushed.
  #[instrument(name = "UploadStore::save", skip_all, fields(kind = %image.kind, size = image.size()), err(Display))]
  pub async fn save(&self, image: &ValidatedImage) -> Result<StoredFile, UploadError> {
    self.ensure_root().await?;
    let stored_name = image.generate_stored_name();
    let final_path = self.root.join(&stored_name);
    let part_path = self.root.join(format!("{stored_name}.part"));

    let write_result = async {
      let mut file = tokio::fs::File::create(&part_path).await?;
      file.write_all(&image.bytes).await?;
      file.sync_all().await?;
      tokio::fs::rename(&part_path, &final_path).await
    }
    .await;

    if let Err(e) = write_result {
      if let Err(cleanup) = tokio::fs::remove_file(&part_path).await {
        debug!(error = %cleanup, "No partial file to clean up.");
      }
      return Err(e.into());
    }

    info!(%stored_name, "Picture file stored.");
    Ok(StoredFile {
      public_url: self.public_url(&stored_name),
      stored_name,
      kind: image.kind,
      size: image.size(),
    })
  }

  /// Maps a stored name to its path, refusing anything that could leave the root.
  pub async fn resolve(&self, stored_name: &str) -> Result<PathBuf, UploadError> {
    check_name(stored_name)?;
    let candidate = self.root.join(stored_name);
    let canonical = match tokio::fs::canonicalize(&candidate).await {
      Ok(p) => p,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(UploadError::NotFound(stored_name.to_string()))
      }
      Err(e) => return Err(e.into()),
    };
    let canonical_root = tokio::fs::canonicalize(&self.root).await?;
    if !canonical.starts_with(&canonical_root) {
      warn!(%stored_name, "Stored name resolves outside the upload directory.");
      return Err(UploadError::PathEscapesUploadDir(stored_name.to_string()));
    }
    Ok(canonical)
  }

  pub async fn read(&self, stored_name: &str) -> Result<Vec<u8>, UploadError> {
    let path = self.resolve(stored_name).await?;
    Ok(tokio::fs::read(path).await?)
  }

  /// Deletes a stored file. Returns `false` when it was already gone.
  #[instrument(name = "UploadStore::remove", skip(self), err(Display))]
  pub async fn remove(&self, stored_name: &str) -> Result<bool, UploadError> {
    let path = match self.resolve(stored_name).await {
      Ok(p) => p,
      Err(UploadError::NotFound(_)) => {
        debug!("File already absent.");
        return Ok(false);
      }
      Err(e) => return Err(e),
    };
    tokio::fs::remove_file(path).await?;
    info!("Picture file removed.");
    Ok(true)
  }
}

/// A stored name must be a single plain path component.
fn check_name(stored_name: &str) -> Result<(), UploadError> {
  let escapes = || UploadError::PathEscapesUploadDir(stored_name.to_string());
  if stored_name.is_empty() || stored_name.contains(['/', '\\', '\0']) {
    return Err(escapes());
  }
  let mut components = Path::new(stored_name).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(()),
    _ => Err(escapes()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn check_name_rejects_traversal() {
    assert!(check_name("abc.png").is_ok());
    for bad in ["", "..", ".", "../x.png", "a/b.png", "a\\b.png", "/etc/passwd", "x\0.png"] {
      assert!(
        matches!(check_name(bad), Err(UploadError::PathEscapesUploadDir(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn public_url_joins_prefix() {
    let store = UploadStore::new("/tmp/x", "/uploads/pictures/");
    assert_eq!(store.public_url("a.png"), "/uploads/pictures/a.png");
  }
}
