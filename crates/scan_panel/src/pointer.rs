use std::fs;
use std::io;
use std::path::PathBuf;

use scan_core::JobId;
use scan_engine::{AtomicFileWriter, PersistError};
use scan_logging::{scan_debug, scan_info, scan_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const POINTER_FILENAME: &str = ".active_scan.ron";

#[derive(Debug, Error)]
pub enum PointerError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("could not encode pointer: {0}")]
    Encode(#[from] ron::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPointer {
    job_id: JobId,
}

/// The one piece of client-local state: the id of the job the panel was
/// tracking, so it can be picked up again after a reload.
#[derive(Debug, Clone)]
pub struct ActiveJobPointer {
    writer: AtomicFileWriter,
}

impl ActiveJobPointer {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    /// `None` when nothing is stored or the file can't be read back.
    pub fn load(&self) -> Option<JobId> {
        let path = self.writer.dir().join(POINTER_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                scan_warn!("Failed to read active job pointer {:?}: {}", path, err);
                return None;
            }
        };

        match ron::from_str::<StoredPointer>(&content) {
            Ok(stored) => {
                scan_info!("Found stored job {} to resume", stored.job_id);
                Some(stored.job_id)
            }
            Err(err) => {
                scan_warn!("Ignoring unreadable active job pointer {:?}: {}", path, err);
                None
            }
        }
    }

    pub fn store(&self, job_id: &JobId) -> Result<(), PointerError> {
        let stored = StoredPointer {
            job_id: job_id.clone(),
        };
        let content = ron::ser::to_string_pretty(&stored, ron::ser::PrettyConfig::new())?;
        self.writer.write(POINTER_FILENAME, &content)?;
        scan_debug!("Stored active job pointer {}", job_id);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), PointerError> {
        self.writer.remove(POINTER_FILENAME)?;
        scan_debug!("Cleared active job pointer");
        Ok(())
    }
}
