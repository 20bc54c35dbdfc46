use crate::error::TokenStoreError;
use reclaim_models::Credential;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Single credential record kept as JSON at a fixed path.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when no record has been saved yet.
    pub fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached token");
                return Ok(None);
            }
            Err(source) => {
                return Err(TokenStoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let credential = serde_json::from_str(&content).map_err(|source| TokenStoreError::Decode {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(credential))
    }

    /// Writes to a sibling temp file and renames it over the record, so an
    /// interrupted save leaves the previous record intact.
    pub fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        let write_err = |source| TokenStoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(credential).map_err(TokenStoreError::Encode)?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content).map_err(write_err)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }

    /// Removes the record. Returns whether there was one.
    pub fn clear(&self) -> Result<bool, TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(TokenStoreError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
