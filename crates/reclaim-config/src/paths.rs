use std::path::{Path, PathBuf};

pub const TOKEN_FILE_NAME: &str = "token.json";

pub struct PathManager {
    token_dir: PathBuf,
}

impl PathManager {
    pub fn new(token_dir: impl Into<PathBuf>) -> Self {
        Self {
            token_dir: token_dir.into(),
        }
    }

    pub fn token_dir(&self) -> &Path {
        &self.token_dir
    }

    pub fn token_file(&self) -> PathBuf {
        self.token_dir.join(TOKEN_FILE_NAME)
    }
}

impl Default for PathManager {
    /// Current working directory
    fn default() -> Self {
        Self::new(".")
    }
}
