use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use vocab_core::model::{
    Question, QuestionType, Score, SessionId, SessionMode, SessionSettings, SessionSummary,
};
use vocab_core::time::elapsed_secs;

use super::feedback::{Feedback, FeedbackGenerator};
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── PHASE & OUTCOMES ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Complete,
}

/// What a cursor-moving call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The call was not valid in the current phase and changed nothing.
    Ignored,
    /// Moved to the question at `cursor`.
    Moved { cursor: usize },
    /// The last question was passed; the run is sealed.
    Completed(SessionSummary),
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Question/answer state machine shared by practice and quiz runs.
///
/// Phases go `NotStarted -> InProgress -> Complete`, and a completed engine
/// can be started again. Operations called in the wrong phase are ignored.
pub struct SessionEngine {
    settings: SessionSettings,
    phase: SessionPhase,
    session_id: Option<SessionId>,
    questions: Vec<Question>,
    cursor: usize,
    current_answered: bool,
    score: Score,
    streak: u32,
    highest_streak: u32,
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: u64,
    auto_advance_at: Option<DateTime<Utc>>,
    last_feedback: Option<Feedback>,
    summary: Option<SessionSummary>,
    recorded: bool,
    feedback: FeedbackGenerator,
}

impl SessionEngine {
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        Self::with_feedback(settings, FeedbackGenerator::new())
    }

    #[must_use]
    pub fn with_feedback(settings: SessionSettings, feedback: FeedbackGenerator) -> Self {
        Self {
            settings,
            phase: SessionPhase::NotStarted,
            session_id: None,
            questions: Vec::new(),
            cursor: 0,
            current_answered: false,
            score: Score::default(),
            streak: 0,
            highest_streak: 0,
            started_at: None,
            elapsed_secs: 0,
            auto_advance_at: None,
            last_feedback: None,
            summary: None,
            recorded: false,
            feedback,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Replace settings between runs. Ignored while a run is in progress.
    pub fn set_settings(&mut self, settings: SessionSettings) -> bool {
        if self.phase == SessionPhase::InProgress {
            tracing::debug!("ignoring settings change during an active session");
            return false;
        }
        self.settings = settings;
        true
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.settings.mode()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase == SessionPhase::InProgress {
            self.questions.get(self.cursor)
        } else {
            None
        }
    }

    /// Whether the current question already has an answer.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.current_answered
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn highest_streak(&self) -> u32 {
        self.highest_streak
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// When a pending auto-advance will fire, if one is scheduled.
    #[must_use]
    pub fn auto_advance_deadline(&self) -> Option<DateTime<Utc>> {
        self.auto_advance_at
    }

    #[must_use]
    pub fn last_feedback(&self) -> Option<&Feedback> {
        self.last_feedback.as_ref()
    }

    /// Summary of the last completed run.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let as_count = |n: u32| usize::try_from(n).unwrap_or(usize::MAX);
        let answered = as_count(self.score.correct.saturating_add(self.score.incorrect));
        let resolved = as_count(self.score.total());
        SessionProgress {
            total,
            answered: answered.min(total),
            remaining: total.saturating_sub(resolved),
            is_complete: self.is_complete(),
            score: self.score,
            streak: self.streak,
            highest_streak: self.highest_streak,
        }
    }

    /// Begin a run over `questions`.
    ///
    /// Ignored (returns `false`) while a run is in progress or when
    /// `questions` is empty.
    pub fn start(&mut self, questions: Vec<Question>, now: DateTime<Utc>) -> bool {
        if self.phase == SessionPhase::InProgress {
            tracing::debug!("start ignored: session already in progress");
            return false;
        }
        if questions.is_empty() {
            tracing::debug!("start ignored: no questions");
            return false;
        }

        let session_id = SessionId::generate();
        tracing::info!(%session_id, questions = questions.len(), mode = %self.mode(), "session started");

        self.phase = SessionPhase::InProgress;
        self.session_id = Some(session_id);
        self.questions = questions;
        self.cursor = 0;
        self.current_answered = false;
        self.score = Score::default();
        self.streak = 0;
        self.highest_streak = 0;
        self.started_at = Some(now);
        self.elapsed_secs = 0;
        self.auto_advance_at = None;
        self.last_feedback = None;
        self.summary = None;
        self.recorded = false;
        true
    }

    /// Drop the active run without producing a summary.
    pub fn abandon(&mut self) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        tracing::info!(session_id = ?self.session_id, cursor = self.cursor, "session abandoned");
        self.phase = SessionPhase::NotStarted;
        self.auto_advance_at = None;
        self.current_answered = false;
        true
    }

    /// Refresh elapsed time. Never moves backwards; frozen outside a run.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.phase != SessionPhase::InProgress {
            return;
        }
        if let Some(started_at) = self.started_at {
            self.elapsed_secs = self.elapsed_secs.max(elapsed_secs(started_at, now));
        }
    }

    /// Answer the current question.
    ///
    /// Returns `None` (and changes nothing) outside a run or if the current
    /// question was already answered.
    pub fn submit_answer(&mut self, answer_id: &str, now: DateTime<Utc>) -> Option<Feedback> {
        if self.phase != SessionPhase::InProgress || self.current_answered {
            tracing::debug!(phase = ?self.phase, "submit ignored");
            return None;
        }
        let question = self.questions.get(self.cursor)?;
        let is_correct = question.is_correct(answer_id);

        if is_correct {
            self.score.record_correct();
            self.streak = self.streak.saturating_add(1);
            self.highest_streak = self.highest_streak.max(self.streak);
        } else {
            self.score.record_incorrect();
            self.streak = 0;
        }
        self.current_answered = true;

        let feedback = self.feedback.generate(is_correct, question, self.streak);
        self.last_feedback = Some(feedback.clone());

        if self.settings.auto_advance() {
            self.auto_advance_at = Some(now + self.settings.auto_advance_delay());
        }
        self.tick(now);
        Some(feedback)
    }

    /// Move past an answered question. Cancels any pending auto-advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the completed run cannot be summarized.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<AdvanceOutcome, SessionError> {
        if self.phase != SessionPhase::InProgress || !self.current_answered {
            tracing::debug!(phase = ?self.phase, "advance ignored");
            return Ok(AdvanceOutcome::Ignored);
        }
        if self.auto_advance_at.take().is_some() {
            tracing::debug!("pending auto-advance cancelled");
        }
        self.step(now)
    }

    /// Skip the current unanswered question (quiz runs only).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the completed run cannot be summarized.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Result<AdvanceOutcome, SessionError> {
        if self.phase != SessionPhase::InProgress
            || self.current_answered
            || !self.mode().allows_skip()
        {
            tracing::debug!(phase = ?self.phase, mode = %self.mode(), "skip ignored");
            return Ok(AdvanceOutcome::Ignored);
        }
        self.score.record_skip();
        self.step(now)
    }

    /// Fire the auto-advance timer if its deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the completed run cannot be summarized.
    pub fn poll_auto_advance(&mut self, now: DateTime<Utc>) -> Result<AdvanceOutcome, SessionError> {
        match self.auto_advance_at {
            Some(deadline) if now >= deadline && self.phase == SessionPhase::InProgress => {
                self.auto_advance_at = None;
                self.step(now)
            }
            _ => Ok(AdvanceOutcome::Ignored),
        }
    }

    fn step(&mut self, now: DateTime<Utc>) -> Result<AdvanceOutcome, SessionError> {
        self.tick(now);
        self.cursor += 1;
        self.current_answered = false;
        self.last_feedback = None;

        if self.cursor < self.questions.len() {
            return Ok(AdvanceOutcome::Moved {
                cursor: self.cursor,
            });
        }

        let summary = self.build_summary(now)?;
        self.phase = SessionPhase::Complete;
        self.summary = Some(summary.clone());
        tracing::info!(
            session_id = %summary.session_id(),
            correct = summary.correct(),
            total = summary.total(),
            highest_streak = summary.highest_streak(),
            elapsed_secs = summary.elapsed_secs(),
            "session complete"
        );
        Ok(AdvanceOutcome::Completed(summary))
    }

    fn build_summary(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        let exercise_types: BTreeSet<QuestionType> =
            self.questions.iter().map(Question::question_type).collect();
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        Ok(SessionSummary::new(
            self.session_id.unwrap_or_else(SessionId::generate),
            self.mode(),
            completed_at,
            self.score.correct,
            total,
            self.highest_streak,
            exercise_types,
            self.elapsed_secs,
        )?)
    }

    pub(crate) fn needs_recording(&self) -> bool {
        self.is_complete() && !self.recorded
    }

    pub(crate) fn mark_recorded(&mut self) {
        self.recorded = true;
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("phase", &self.phase)
            .field("session_id", &self.session_id)
            .field("questions_len", &self.questions.len())
            .field("cursor", &self.cursor)
            .field("score", &self.score)
            .field("streak", &self.streak)
            .field("highest_streak", &self.highest_streak)
            .field("elapsed_secs", &self.elapsed_secs)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
