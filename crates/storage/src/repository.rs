use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vocab_core::model::{EngineSnapshot, ProgressCounters, Question, QuestionId, QuestionType};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Source of exercise questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Every stored question whose kind is in `types`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_questions(&self, types: &[QuestionType]) -> Result<Vec<Question>, StorageError>;

    /// Number of stored questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_questions(&self) -> Result<u64, StorageError>;
}

/// All-or-nothing snapshot store for engine state.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn load_snapshot(&self) -> Result<Option<EngineSnapshot>, StorageError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be written.
    async fn save_snapshot(&self, snapshot: &EngineSnapshot) -> Result<(), StorageError>;
}

/// Owner of the learner's cumulative progress counters.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Current counters (defaults when none were saved).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn load_counters(&self) -> Result<ProgressCounters, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the counters cannot be written.
    async fn save_counters(&self, counters: &ProgressCounters) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Snapshots are kept as serialized JSON so a save/load cycle exercises the
/// same round-trip as a durable backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    snapshot: Arc<Mutex<Option<String>>>,
    progress: Arc<Mutex<Option<ProgressCounters>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository preloaded with questions.
    #[must_use]
    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.questions.lock() {
            guard.extend(questions.into_iter().map(|q| (q.id(), q)));
        }
        repo
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn list_questions(&self, types: &[QuestionType]) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|q| types.contains(&q.question_type()))
            .cloned()
            .collect())
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.len() as u64)
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn load_snapshot(&self) -> Result<Option<EngineSnapshot>, StorageError> {
        let guard = self.snapshot.lock().map_err(poisoned)?;
        guard
            .as_deref()
            .map(serde_json::from_str::<EngineSnapshot>)
            .transpose()
            .map_err(StorageError::from)
    }

    async fn save_snapshot(&self, snapshot: &EngineSnapshot) -> Result<(), StorageError> {
        let blob = serde_json::to_string(snapshot)?;
        let mut guard = self.snapshot.lock().map_err(poisoned)?;
        *guard = Some(blob);
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_counters(&self) -> Result<ProgressCounters, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.unwrap_or_default())
    }

    async fn save_counters(&self, counters: &ProgressCounters) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        *guard = Some(*counters);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    /// Share one in-memory repository across every trait object.
    #[must_use]
    pub fn from_repo(repo: InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            questions,
            snapshots,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::builtin_questions;
    use vocab_core::model::{EngineSnapshot, SessionMode};

    #[tokio::test]
    async fn lists_questions_by_kind() {
        let repo = InMemoryRepository::with_questions(builtin_questions().unwrap());
        let all = repo.list_questions(&QuestionType::ALL).await.unwrap();
        assert_eq!(all.len() as u64, repo.count_questions().await.unwrap());

        let matching = repo
            .list_questions(&[QuestionType::Matching])
            .await
            .unwrap();
        assert!(!matching.is_empty());
        assert!(
            matching
                .iter()
                .all(|q| q.question_type() == QuestionType::Matching)
        );
        assert!(repo.list_questions(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_snapshot().await.unwrap().is_none());

        let mut snapshot = EngineSnapshot::default();
        snapshot.settings = snapshot.settings.with_mode(SessionMode::Quiz);
        repo.save_snapshot(&snapshot).await.unwrap();

        let loaded = repo.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn progress_defaults_until_saved() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.load_counters().await.unwrap(), ProgressCounters::default());

        let counters = ProgressCounters {
            words_learned: 12,
            ..ProgressCounters::default()
        };
        repo.save_counters(&counters).await.unwrap();
        assert_eq!(repo.load_counters().await.unwrap(), counters);
    }
}
