//! [`DiskStorage`] — a [`FileStorage`] rooted at a local directory.

use std::{
  io,
  path::{Path, PathBuf},
};

use onboard_core::files::FileStorage;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DiskStorage {
  root: PathBuf,
}

impl DiskStorage {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Resolve a stored name to a path inside the root. Names that could
  /// escape the root are rejected.
  fn path_for(&self, stored_name: &str) -> io::Result<PathBuf> {
    let plain = !stored_name.is_empty()
      && !stored_name.starts_with('.')
      && !stored_name.contains(['/', '\\']);
    if !plain {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid stored name {stored_name:?}"),
      ));
    }
    Ok(self.root.join(stored_name))
  }
}

/// Lower-cased extension of `name`, if it is short and alphanumeric.
fn extension_of(name: &str) -> Option<String> {
  let ext = Path::new(name).extension()?.to_str()?;
  (!ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .then(|| ext.to_ascii_lowercase())
}

impl FileStorage for DiskStorage {
  async fn save(&self, bytes: &[u8], suggested_name: &str) -> io::Result<String> {
    let stored_name = match extension_of(suggested_name) {
      Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
      None => Uuid::new_v4().to_string(),
    };
    tokio::fs::create_dir_all(&self.root).await?;
    tokio::fs::write(self.root.join(&stored_name), bytes).await?;
    Ok(stored_name)
  }

  async fn delete(&self, stored_name: &str) -> io::Result<()> {
    match tokio::fs::remove_file(self.path_for(stored_name)?).await {
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      other => other,
    }
  }

  async fn exists(&self, stored_name: &str) -> io::Result<bool> {
    tokio::fs::try_exists(self.path_for(stored_name)?).await
  }

  async fn read(&self, stored_name: &str) -> io::Result<Vec<u8>> {
    tokio::fs::read(self.path_for(stored_name)?).await
  }
}
