use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::question::QuestionType;
use crate::model::session::SessionMode;

pub const MAX_QUESTION_COUNT: u32 = 50;
pub const MIN_AUTO_ADVANCE_MS: u32 = 250;
pub const MAX_AUTO_ADVANCE_MS: u32 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question count must be between 1 and 50")]
    InvalidQuestionCount,

    #[error("at least one question type must be selected")]
    NoQuestionTypes,

    #[error("auto-advance delay must be between 250 and 10000 ms")]
    InvalidAutoAdvanceDelay,
}

/// Unvalidated settings as edited by the user.
#[derive(Debug, Clone, Default)]
pub struct SessionSettingsDraft {
    pub mode: SessionMode,
    pub question_count: u32,
    pub question_types: BTreeSet<QuestionType>,
    pub auto_advance: bool,
    pub auto_advance_delay_ms: u32,
}

impl SessionSettingsDraft {
    /// # Errors
    ///
    /// Returns `SettingsError` if any field is out of range.
    pub fn validate(self) -> Result<SessionSettings, SettingsError> {
        SessionSettings::new(
            self.mode,
            self.question_count,
            self.question_types,
            self.auto_advance,
            self.auto_advance_delay_ms,
        )
    }
}

impl From<&SessionSettings> for SessionSettingsDraft {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            mode: settings.mode,
            question_count: settings.question_count,
            question_types: settings.question_types.clone(),
            auto_advance: settings.auto_advance,
            auto_advance_delay_ms: settings.auto_advance_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SessionSettingsRecord {
    mode: SessionMode,
    question_count: u32,
    question_types: BTreeSet<QuestionType>,
    auto_advance: bool,
    auto_advance_delay_ms: u32,
}

impl TryFrom<SessionSettingsRecord> for SessionSettings {
    type Error = SettingsError;

    fn try_from(r: SessionSettingsRecord) -> Result<Self, Self::Error> {
        SessionSettings::new(
            r.mode,
            r.question_count,
            r.question_types,
            r.auto_advance,
            r.auto_advance_delay_ms,
        )
    }
}

/// User-tunable knobs for starting and pacing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionSettingsRecord")]
pub struct SessionSettings {
    mode: SessionMode,
    question_count: u32,
    question_types: BTreeSet<QuestionType>,
    auto_advance: bool,
    auto_advance_delay_ms: u32,
}

impl SessionSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` if the count, type set, or delay are out of range.
    pub fn new(
        mode: SessionMode,
        question_count: u32,
        question_types: BTreeSet<QuestionType>,
        auto_advance: bool,
        auto_advance_delay_ms: u32,
    ) -> Result<Self, SettingsError> {
        if question_count == 0 || question_count > MAX_QUESTION_COUNT {
            return Err(SettingsError::InvalidQuestionCount);
        }
        if question_types.is_empty() {
            return Err(SettingsError::NoQuestionTypes);
        }
        if !(MIN_AUTO_ADVANCE_MS..=MAX_AUTO_ADVANCE_MS).contains(&auto_advance_delay_ms) {
            return Err(SettingsError::InvalidAutoAdvanceDelay);
        }
        Ok(Self {
            mode,
            question_count,
            question_types,
            auto_advance,
            auto_advance_delay_ms,
        })
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn question_types(&self) -> &BTreeSet<QuestionType> {
        &self.question_types
    }

    #[must_use]
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    #[must_use]
    pub fn auto_advance_delay(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::from(self.auto_advance_delay_ms))
    }

    #[must_use]
    pub fn auto_advance_delay_ms(&self) -> u32 {
        self.auto_advance_delay_ms
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Copy of these settings with auto-advance toggled.
    #[must_use]
    pub fn with_auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: SessionMode::Practice,
            question_count: 10,
            question_types: QuestionType::ALL.into_iter().collect(),
            auto_advance: true,
            auto_advance_delay_ms: 1_500,
        }
    }
}
