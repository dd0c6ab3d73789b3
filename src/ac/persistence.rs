//! Last-known AC status on disk.
//!
//! An IR-driven unit cannot be queried, so after a restart the only record of
//! what it was last told to do is the status saved here on every commit.

use super::AcStatus;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Status as written to the state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAcStatus {
    pub status: AcStatus,
    pub saved_at: DateTime<Utc>,
}

/// JSON file holding the last committed status.
#[derive(Debug, Clone)]
pub struct AcStatusFile {
    path: PathBuf,
}

impl AcStatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved status. Missing or unreadable files yield `None`.
    pub fn load(&self) -> Option<PersistedAcStatus> {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<PersistedAcStatus>(&bytes) {
                Ok(saved) => {
                    info!(
                        "[AC] Loaded last status {} (saved {}) from {:?}",
                        saved.status, saved.saved_at, self.path
                    );
                    Some(saved)
                }
                Err(e) => {
                    warn!("[AC] Failed to parse status file {:?}: {}", self.path, e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[AC] No saved status at {:?} (first run)", self.path);
                None
            }
            Err(e) => {
                error!("[AC] Failed to read status file {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Write `status` with the current time, creating parent directories.
    pub fn save(&self, status: &AcStatus) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = PersistedAcStatus {
            status: *status,
            saved_at: Utc::now(),
        };
        let data = serde_json::to_vec_pretty(&record)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ac::AcMode;

    fn temp_file() -> AcStatusFile {
        AcStatusFile::new(
            std::env::temp_dir()
                .join(format!("mattori-home-{}", uuid::Uuid::new_v4()))
                .join("ac_status.json"),
        )
    }

    #[test]
    fn test_missing_file_loads_none() {
        let file = temp_file();
        assert!(file.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let file = temp_file();
        let status = AcStatus {
            powered: true,
            mode: AcMode::Dry,
            temperature: 26,
        };
        file.save(&status).unwrap();

        let saved = file.load().unwrap();
        assert_eq!(saved.status, status);
        assert!(saved.saved_at <= Utc::now());

        let _ = fs::remove_dir_all(file.path().parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_loads_none() {
        let file = temp_file();
        fs::create_dir_all(file.path().parent().unwrap()).unwrap();
        fs::write(file.path(), b"{ not json").unwrap();
        assert!(file.load().is_none());

        let _ = fs::remove_dir_all(file.path().parent().unwrap());
    }
}
