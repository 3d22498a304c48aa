use std::sync::Arc;

use chrono::{DateTime, Utc};

use storage::repository::{ProgressRepository, QuestionRepository, SnapshotRepository, Storage};
use vocab_core::model::{
    Achievement, AllTimeTotals, EngineSnapshot, PERFECT_SESSION_ID, ProgressCounters,
    SessionSettings, SessionSummary, check_achievements,
};

use super::engine::{AdvanceOutcome, SessionEngine};
use super::feedback::{Feedback, FeedbackGenerator};
use super::plan::QuestionPool;
use crate::Clock;
use crate::error::SessionError;

/// Everything a finished run changed in persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCompletion {
    pub summary: SessionSummary,
    pub newly_unlocked: Vec<Achievement>,
    pub all_time: AllTimeTotals,
    pub counters: ProgressCounters,
}

/// Result of a cursor-moving call made through the loop service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStep {
    Ignored,
    Moved { cursor: usize },
    Completed(Box<SessionCompletion>),
}

/// Orchestrates session start, answering and persisted completion.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    pool: QuestionPool,
    snapshots: Arc<dyn SnapshotRepository>,
    progress: Arc<dyn ProgressRepository>,
    feedback_seed: Option<u64>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            pool: QuestionPool::new(questions),
            snapshots,
            progress,
            feedback_seed: None,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.snapshots),
            Arc::clone(&storage.progress),
        )
    }

    /// Seed question shuffling and feedback phrasing for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.pool = self.pool.with_seed(seed);
        self.feedback_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Stored snapshot, or defaults on first launch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the snapshot cannot be read.
    pub async fn load_snapshot(&self) -> Result<EngineSnapshot, SessionError> {
        Ok(self.snapshots.load_snapshot().await?.unwrap_or_default())
    }

    /// Build an idle engine for `settings`.
    #[must_use]
    pub fn new_engine(&self, settings: SessionSettings) -> SessionEngine {
        let feedback = match self.feedback_seed {
            Some(seed) => FeedbackGenerator::seeded(seed),
            None => FeedbackGenerator::new(),
        };
        SessionEngine::with_feedback(settings, feedback)
    }

    /// Draw questions and start a run. The engine is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InProgress` if a run is already active,
    /// `SessionError::Empty` if no question matches the settings, and
    /// `SessionError::Storage` if questions cannot be read.
    pub async fn start_session(&self, engine: &mut SessionEngine) -> Result<usize, SessionError> {
        if engine.phase() == super::SessionPhase::InProgress {
            return Err(SessionError::InProgress);
        }
        let questions = match self.pool.draw(engine.settings()).await {
            Ok(questions) => questions,
            Err(err) => {
                tracing::warn!(error = %err, "could not start session");
                return Err(err);
            }
        };
        let count = questions.len();
        if !engine.start(questions, self.clock.now()) {
            return Err(SessionError::Empty);
        }
        Ok(count)
    }

    /// Answer the current question at the service clock's time.
    pub fn submit_answer(&self, engine: &mut SessionEngine, answer_id: &str) -> Option<Feedback> {
        engine.submit_answer(answer_id, self.clock.now())
    }

    /// Move past the answered question, recording the run when it completes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the summary cannot be built or persisted.
    /// A completed run whose recording failed can be retried with
    /// [`finalize_summary`](Self::finalize_summary).
    pub async fn advance(&self, engine: &mut SessionEngine) -> Result<LoopStep, SessionError> {
        let outcome = engine.advance(self.clock.now())?;
        self.after_step(engine, outcome).await
    }

    /// Skip the current question (quiz runs only).
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the summary cannot be built or persisted.
    pub async fn skip(&self, engine: &mut SessionEngine) -> Result<LoopStep, SessionError> {
        let outcome = engine.skip(self.clock.now())?;
        self.after_step(engine, outcome).await
    }

    /// Sleep until the pending auto-advance deadline, then fire it.
    ///
    /// Returns `LoopStep::Ignored` immediately when nothing is scheduled.
    /// Not cancel-safe once the deadline passes: callers racing this against
    /// other input should race [`sleep_until`](Self::sleep_until) instead and
    /// call [`fire_auto_advance`](Self::fire_auto_advance) afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the summary cannot be built or persisted.
    pub async fn wait_auto_advance(
        &self,
        engine: &mut SessionEngine,
    ) -> Result<LoopStep, SessionError> {
        let Some(deadline) = engine.auto_advance_deadline() else {
            return Ok(LoopStep::Ignored);
        };
        self.sleep_until(deadline).await;
        self.fire_auto_advance(engine).await
    }

    /// Sleep until `deadline` on the service clock. Touches no state, so it
    /// can be dropped at any point.
    pub async fn sleep_until(&self, deadline: DateTime<Utc>) {
        if let Ok(wait) = (deadline - self.clock.now()).to_std() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Fire a scheduled auto-advance, treating its deadline as reached.
    ///
    /// Returns `LoopStep::Ignored` when nothing is scheduled.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the summary cannot be built or persisted.
    pub async fn fire_auto_advance(
        &self,
        engine: &mut SessionEngine,
    ) -> Result<LoopStep, SessionError> {
        let Some(deadline) = engine.auto_advance_deadline() else {
            return Ok(LoopStep::Ignored);
        };
        // a fixed clock never reaches the deadline on its own
        let now = self.clock.now().max(deadline);
        let outcome = engine.poll_auto_advance(now)?;
        self.after_step(engine, outcome).await
    }

    /// Retry persisting a completed run.
    ///
    /// Returns `Ok(None)` if the run was already recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if the engine has no completed run.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_summary(
        &self,
        engine: &mut SessionEngine,
    ) -> Result<Option<SessionCompletion>, SessionError> {
        if !engine.is_complete() {
            return Err(SessionError::NotComplete);
        }
        if !engine.needs_recording() {
            return Ok(None);
        }
        let summary = engine.summary().cloned().ok_or(SessionError::NotComplete)?;
        self.record(engine, summary).await.map(Some)
    }

    async fn after_step(
        &self,
        engine: &mut SessionEngine,
        outcome: AdvanceOutcome,
    ) -> Result<LoopStep, SessionError> {
        match outcome {
            AdvanceOutcome::Ignored => Ok(LoopStep::Ignored),
            AdvanceOutcome::Moved { cursor } => Ok(LoopStep::Moved { cursor }),
            AdvanceOutcome::Completed(summary) => {
                let completion = self.record(engine, summary).await?;
                Ok(LoopStep::Completed(Box::new(completion)))
            }
        }
    }

    async fn record(
        &self,
        engine: &mut SessionEngine,
        summary: SessionSummary,
    ) -> Result<SessionCompletion, SessionError> {
        let session_id = summary.session_id();
        match self.record_completion(summary).await {
            Ok(completion) => {
                engine.mark_recorded();
                Ok(completion)
            }
            Err(err) => {
                tracing::warn!(error = %err, %session_id, "could not record completed session");
                Err(err)
            }
        }
    }

    async fn record_completion(
        &self,
        summary: SessionSummary,
    ) -> Result<SessionCompletion, SessionError> {
        let now = self.clock.now();
        let mut snapshot = self.load_snapshot().await?;
        let mut counters = self.progress.load_counters().await?;

        // a retry after a failed counters save must not append the run twice
        let already_in_history = snapshot
            .history
            .entries()
            .any(|entry| entry.session_id() == summary.session_id());

        let mut newly_unlocked = Vec::new();
        if !already_in_history {
            snapshot.history.record(summary.clone());
        }
        counters.record_session(&summary, snapshot.history.accuracy());

        if !already_in_history {
            newly_unlocked = check_achievements(&mut snapshot.achievements, &counters, now);
            if summary.total() > 0 && summary.percentage() == 100 {
                if let Some(perfect) = snapshot
                    .achievements
                    .iter_mut()
                    .find(|a| a.id() == PERFECT_SESSION_ID)
                {
                    if perfect.unlock(now) {
                        newly_unlocked.push(perfect.clone());
                    }
                }
            }
            self.snapshots.save_snapshot(&snapshot).await?;
        }
        self.progress.save_counters(&counters).await?;

        for achievement in &newly_unlocked {
            tracing::info!(id = achievement.id(), title = achievement.title(), "achievement unlocked");
        }
        tracing::info!(
            session_id = %summary.session_id(),
            percentage = summary.percentage(),
            sessions = snapshot.history.all_time().sessions,
            "session recorded"
        );

        Ok(SessionCompletion {
            all_time: snapshot.history.all_time(),
            summary,
            newly_unlocked,
            counters,
        })
    }
}
