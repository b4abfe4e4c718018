//! Loading of the optional `file` a definition requires before instantiation.

use crate::error::BoxError;
use std::fs;
use std::path::Path;

/// Loads a unit of code or data at a path. The container calls it at most
/// once per distinct path.
pub trait FileLoader: Send + Sync {
  fn load(&self, path: &Path) -> Result<(), BoxError>;
}

/// The default loader: checks that the path exists and is a regular file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl FileLoader for FsLoader {
  fn load(&self, path: &Path) -> Result<(), BoxError> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
      return Err(format!("{} is not a file", path.display()).into());
    }
    Ok(())
  }
}

impl<F> FileLoader for F
where
  F: Fn(&Path) -> Result<(), BoxError> + Send + Sync,
{
  fn load(&self, path: &Path) -> Result<(), BoxError> {
    self(path)
  }
}
