use std::sync::Arc;

use storage::repository::SnapshotRepository;
use vocab_core::model::{SessionSettings, SessionSettingsDraft};

use crate::error::SettingsServiceError;

#[derive(Clone)]
pub struct SettingsService {
    snapshots: Arc<dyn SnapshotRepository>,
}

impl SettingsService {
    #[must_use]
    pub fn new(snapshots: Arc<dyn SnapshotRepository>) -> Self {
        Self { snapshots }
    }

    /// Load persisted settings (or defaults if missing).
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` on storage failures.
    pub async fn load(&self) -> Result<SessionSettings, SettingsServiceError> {
        let snapshot = self.snapshots.load_snapshot().await?;
        Ok(snapshot.map(|s| s.settings).unwrap_or_default())
    }

    /// Validate and persist new settings, keeping history and achievements.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` if validation fails or persistence fails.
    pub async fn save(
        &self,
        draft: SessionSettingsDraft,
    ) -> Result<SessionSettings, SettingsServiceError> {
        let settings = draft.validate()?;
        let mut snapshot = self.snapshots.load_snapshot().await?.unwrap_or_default();
        snapshot.settings = settings.clone();
        self.snapshots.save_snapshot(&snapshot).await?;
        tracing::debug!(?settings, "settings saved");
        Ok(settings)
    }
}
