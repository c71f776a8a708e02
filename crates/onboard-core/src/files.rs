//! Blob storage for uploaded documents. No file contents live in the store;
//! documents only carry the name a [`FileStorage`] gave them.

use std::{future::Future, io};

pub trait FileStorage: Send + Sync {
  /// Persist `bytes` and return the generated stored name. `suggested_name`
  /// only contributes its extension.
  fn save<'a>(
    &'a self,
    bytes: &'a [u8],
    suggested_name: &'a str,
  ) -> impl Future<Output = io::Result<String>> + Send + 'a;

  /// Remove a stored file. Deleting a name that does not exist succeeds.
  fn delete<'a>(
    &'a self,
    stored_name: &'a str,
  ) -> impl Future<Output = io::Result<()>> + Send + 'a;

  fn exists<'a>(
    &'a self,
    stored_name: &'a str,
  ) -> impl Future<Output = io::Result<bool>> + Send + 'a;

  fn read<'a>(
    &'a self,
    stored_name: &'a str,
  ) -> impl Future<Output = io::Result<Vec<u8>>> + Send + 'a;
}
