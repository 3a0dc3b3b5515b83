use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::media::Upload;
use crate::domain::ports::MediaStore;

/// Stores uploads under a local directory that is served at `base_url`.
pub struct FsMediaStore {
    root: PathBuf,
    base_url: String,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Maps one of our URLs back to its file; foreign URLs give `None`.
    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl MediaStore for FsMediaStore {
    fn store(&self, folder: &str, upload: &Upload) -> Result<String, DomainError> {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir)
            .map_err(|e| DomainError::Internal(format!("cannot create {}: {e}", dir.display())))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), upload.extension());
        let path = dir.join(&file_name);
        fs::write(&path, &upload.bytes)
            .map_err(|e| DomainError::Internal(format!("cannot write {}: {e}", path.display())))?;

        log::debug!("Stored upload {} at {}", upload.file_name, path.display());
        Ok(format!("{}/{folder}/{file_name}", self.base_url))
    }

    fn delete(&self, url: &str) -> Result<(), DomainError> {
        let Some(path) = self.path_for(url) else {
            log::debug!("Skipping delete of foreign media URL {url}");
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Internal(format!(
                "cannot delete {}: {e}",
                path.display()
            ))),
        }
    }
}
