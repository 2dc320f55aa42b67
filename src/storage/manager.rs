use std::sync::{Arc, PoisonError, RwLock};

use super::record::{StorageFormat, StoredCaptureRecord};
use crate::backend::Backend;
use crate::capture::Packet;
use crate::error::{AnalyzerError, Result};
use crate::session::{CaptureSession, SessionSnapshot, SessionStore};

/// Saves, lists, loads and deletes named captures held by the service.
///
/// The inventory kept here is a display cache. It is only ever replaced by a
/// fresh listing and is never patched locally after a save or delete.
pub struct CaptureStorage {
    backend: Arc<dyn Backend>,
    store: Arc<SessionStore>,
    index: RwLock<Vec<StoredCaptureRecord>>,
}

impl CaptureStorage {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<SessionStore>) -> Self {
        Self {
            backend,
            store,
            index: RwLock::new(Vec::new()),
        }
    }

    /// Saves `packets` under `name`, then refreshes the inventory.
    ///
    /// Returns the refreshed record for `name`, or `None` when the save was
    /// acknowledged but the follow-up listing failed or did not include it.
    pub async fn save(
        &self,
        packets: &[Packet],
        name: &str,
        format: StorageFormat,
    ) -> Result<Option<StoredCaptureRecord>> {
        if packets.is_empty() {
            return Err(AnalyzerError::validation("no packets to save"));
        }
        let name = validate_name(name)?;

        self.backend.save_capture(packets, name, format).await?;
        log::info!("Saved {} packets as '{}' ({})", packets.len(), name, format);

        match self.list().await {
            Ok(records) => Ok(records.into_iter().find(|r| r.filename == name)),
            Err(e) => {
                log::warn!("Saved '{}' but could not refresh the capture list: {}", name, e);
                Ok(None)
            }
        }
    }

    /// Saves the packets of the current session.
    pub async fn save_current(&self, name: &str, format: StorageFormat) -> Result<Option<StoredCaptureRecord>> {
        let snapshot = self.store.snapshot();
        self.save(&snapshot.packets, name, format).await
    }

    /// Fetches the inventory from the service and replaces the cached copy.
    pub async fn list(&self) -> Result<Vec<StoredCaptureRecord>> {
        let records = self.backend.list_captures().await?;
        log::debug!("Listed {} stored captures", records.len());
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = records.clone();
        Ok(records)
    }

    /// The inventory as of the last successful [`list`](Self::list). May be stale.
    pub fn cached_index(&self) -> Vec<StoredCaptureRecord> {
        self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the current session with the stored packets.
    ///
    /// The loaded session carries no analyses, statistics or issues; those
    /// stages are not re-run. On failure the current session is untouched.
    pub async fn load(&self, name: &str) -> Result<SessionSnapshot> {
        let name = validate_name(name)?;
        let writer = self.store.writer().await;

        let packets = self.backend.load_capture(name).await?;
        crate::capture::ensure_unique_numbers(&packets)?;

        log::info!("Loaded {} packets from '{}'", packets.len(), name);
        Ok(writer.publish(CaptureSession::loaded(packets)))
    }

    /// Deletes a stored capture. Asking for consent is the caller's job.
    ///
    /// Deleting a name the service does not know is reported as an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        self.backend.delete_capture(name).await?;
        log::info!("Deleted stored capture '{}'", name);

        if let Err(e) = self.list().await {
            log::warn!("Deleted '{}' but could not refresh the capture list: {}", name, e);
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AnalyzerError::validation("capture name must not be empty"));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
        return Err(AnalyzerError::validation(format!(
            "capture name '{}' must not contain path separators",
            trimmed
        )));
    }
    Ok(trimmed)
}
