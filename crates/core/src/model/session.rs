use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::SessionId;
use crate::model::question::QuestionType;
use crate::model::score::percentage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("correct answers ({correct}) exceed total ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("highest streak ({streak}) exceeds correct answers ({correct})")]
    StreakOverflow { streak: u32, correct: u32 },
}

/// Whether a run is free practice or a quiz (quiz runs allow skipping).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Practice,
    Quiz,
}

impl SessionMode {
    #[must_use]
    pub fn allows_skip(self) -> bool {
        matches!(self, SessionMode::Quiz)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Practice => f.write_str("practice"),
            SessionMode::Quiz => f.write_str("quiz"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SessionSummaryRecord {
    session_id: SessionId,
    mode: SessionMode,
    completed_at: DateTime<Utc>,
    correct: u32,
    total: u32,
    highest_streak: u32,
    exercise_types: BTreeSet<QuestionType>,
    elapsed_secs: u64,
}

impl TryFrom<SessionSummaryRecord> for SessionSummary {
    type Error = SessionSummaryError;

    fn try_from(r: SessionSummaryRecord) -> Result<Self, Self::Error> {
        SessionSummary::new(
            r.session_id,
            r.mode,
            r.completed_at,
            r.correct,
            r.total,
            r.highest_streak,
            r.exercise_types,
            r.elapsed_secs,
        )
    }
}

/// Immutable record of a finished session, kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionSummaryRecord")]
pub struct SessionSummary {
    session_id: SessionId,
    mode: SessionMode,
    completed_at: DateTime<Utc>,
    correct: u32,
    total: u32,
    highest_streak: u32,
    exercise_types: BTreeSet<QuestionType>,
    elapsed_secs: u64,
}

impl SessionSummary {
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if `correct > total` or the streak exceeds `correct`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: SessionId,
        mode: SessionMode,
        completed_at: DateTime<Utc>,
        correct: u32,
        total: u32,
        highest_streak: u32,
        exercise_types: BTreeSet<QuestionType>,
        elapsed_secs: u64,
    ) -> Result<Self, SessionSummaryError> {
        if correct > total {
            return Err(SessionSummaryError::CountMismatch { correct, total });
        }
        if highest_streak > correct {
            return Err(SessionSummaryError::StreakOverflow {
                streak: highest_streak,
                correct,
            });
        }
        Ok(Self {
            session_id,
            mode,
            completed_at,
            correct,
            total,
            highest_streak,
            exercise_types,
            elapsed_secs,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn highest_streak(&self) -> u32 {
        self.highest_streak
    }

    #[must_use]
    pub fn exercise_types(&self) -> &BTreeSet<QuestionType> {
        &self.exercise_types
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        percentage(u64::from(self.correct), u64::from(self.total))
    }
}
