use std::sync::Arc;

use storage::repository::{ProgressRepository, SnapshotRepository};
use chrono::{DateTime, Utc};
use vocab_core::model::{
    Achievement, AllTimeTotals, ProgressCounters, SessionSummary, check_achievements,
};

use crate::error::AchievementServiceError;

/// Access to history, counters and achievement unlock state.
#[derive(Clone)]
pub struct AchievementService {
    snapshots: Arc<dyn SnapshotRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl AchievementService {
    #[must_use]
    pub fn new(
        snapshots: Arc<dyn SnapshotRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            snapshots,
            progress,
        }
    }

    /// Every achievement with its current progress, in table order.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError` on storage failures.
    pub async fn achievements(&self) -> Result<Vec<Achievement>, AchievementServiceError> {
        let snapshot = self.snapshots.load_snapshot().await?.unwrap_or_default();
        Ok(snapshot.achievements)
    }

    /// Unlocked achievements only.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError` on storage failures.
    pub async fn unlocked(&self) -> Result<Vec<Achievement>, AchievementServiceError> {
        let mut list = self.achievements().await?;
        list.retain(Achievement::is_unlocked);
        Ok(list)
    }

    /// Recent sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError` on storage failures.
    pub async fn recent_sessions(&self) -> Result<Vec<SessionSummary>, AchievementServiceError> {
        let snapshot = self.snapshots.load_snapshot().await?.unwrap_or_default();
        Ok(snapshot.history.entries().cloned().collect())
    }

    /// # Errors
    ///
    /// Returns `AchievementServiceError` on storage failures.
    pub async fn all_time(&self) -> Result<AllTimeTotals, AchievementServiceError> {
        let snapshot = self.snapshots.load_snapshot().await?.unwrap_or_default();
        Ok(snapshot.history.all_time())
    }

    /// Re-evaluate locked achievements against the stored counters and
    /// persist the result. Returns the entries unlocked by this call.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError` on storage failures.
    pub async fn evaluate(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Achievement>, AchievementServiceError> {
        let mut snapshot = self.snapshots.load_snapshot().await?.unwrap_or_default();
        let counters = self.progress.load_counters().await?;
        let newly_unlocked = check_achievements(&mut snapshot.achievements, &counters, now);
        self.snapshots.save_snapshot(&snapshot).await?;
        for achievement in &newly_unlocked {
            tracing::info!(id = achievement.id(), "achievement unlocked");
        }
        Ok(newly_unlocked)
    }

    /// # Errors
    ///
    /// Returns `AchievementServiceError` on storage failures.
    pub async fn counters(&self) -> Result<ProgressCounters, AchievementServiceError> {
        Ok(self.progress.load_counters().await?)
    }
}
