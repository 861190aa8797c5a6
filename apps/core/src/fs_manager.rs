use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Layout of the on-disk data directory.
///
/// ```text
/// data/
///   db/pulse.sqlite     (sqlite backend)
///   feedback/*.json     (file backend)
/// ```
#[derive(Debug, Clone)]
pub struct PortablePathManager {
    root: PathBuf,
}

impl PortablePathManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Main data directory.
    pub fn data_dir(&self) -> &Path {
        &self.root
    }

    /// Database directory (./data/db).
    pub fn db_dir(&self) -> PathBuf {
        self.root.join("db")
    }

    /// SQLite key-value database file.
    pub fn db_path(&self) -> PathBuf {
        self.db_dir().join("pulse.sqlite")
    }

    /// Directory of the JSON file store (./data/feedback).
    pub fn feedback_dir(&self) -> PathBuf {
        self.root.join("feedback")
    }

    /// Creates the data, db and feedback directories if missing.
    pub fn init(&self) -> Result<(), std::io::Error> {
        for dir in [self.root.clone(), self.db_dir(), self.feedback_dir()] {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                info!("Created directory: {:?}", dir);
            }
        }
        Ok(())
    }
}
