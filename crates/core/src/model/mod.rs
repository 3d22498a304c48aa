mod achievement;
mod history;
mod ids;
mod progress;
mod question;
mod score;
mod session;
mod settings;
mod snapshot;

pub use ids::{ParseIdError, QuestionId, SessionId};

pub use achievement::{
    Achievement, AchievementCategory, AchievementLevel, LOCKED_PROGRESS_CAP, PERFECT_SESSION_ID,
    check_achievements, default_achievements,
};
pub use history::{AllTimeTotals, HISTORY_CAPACITY, SessionHistory};
pub use progress::ProgressCounters;
pub use question::{AnswerOption, MatchPair, Question, QuestionError, QuestionKind, QuestionType};
pub use score::{Score, percentage};
pub use session::{SessionMode, SessionSummary, SessionSummaryError};
pub use settings::{
    MAX_AUTO_ADVANCE_MS, MAX_QUESTION_COUNT, MIN_AUTO_ADVANCE_MS, SessionSettings, SessionSettingsDraft,
    SettingsError,
};
pub use snapshot::EngineSnapshot;
