#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod error;
pub mod sessions;
pub mod settings_service;

pub use vocab_core::Clock;
pub use sessions as session;

pub use achievement_service::AchievementService;
pub use error::{AchievementServiceError, SessionError, SettingsServiceError};
pub use settings_service::SettingsService;

pub use sessions::{
    AdvanceOutcome, Feedback, FeedbackGenerator, LoopStep, QuestionPool, SessionCompletion,
    SessionEngine, SessionLoopService, SessionPhase, SessionProgress,
};
