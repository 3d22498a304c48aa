use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::achievement::AchievementCategory;
use crate::model::session::{SessionMode, SessionSummary};

/// Cumulative learner progress read by the achievement evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub words_learned: u32,
    pub quizzes_completed: u32,
    pub mastery_percent: u32,
    /// Consecutive calendar days with at least one completed session.
    pub streak_days: u32,
    pub last_active_on: Option<NaiveDate>,
}

impl ProgressCounters {
    /// Counter compared against an achievement of the given category.
    ///
    /// Special achievements are not counter-driven and return `None`.
    #[must_use]
    pub fn counter_for(&self, category: AchievementCategory) -> Option<u32> {
        match category {
            AchievementCategory::Streak => Some(self.streak_days),
            AchievementCategory::Words => Some(self.words_learned),
            AchievementCategory::Quizzes => Some(self.quizzes_completed),
            AchievementCategory::Mastery => Some(self.mastery_percent),
            AchievementCategory::Special => None,
        }
    }

    /// Folds a completed session into the counters.
    ///
    /// `all_time_accuracy` is the history-wide accuracy after the session was recorded.
    pub fn record_session(&mut self, summary: &SessionSummary, all_time_accuracy: u32) {
        self.words_learned = self.words_learned.saturating_add(summary.correct());
        if summary.mode() == SessionMode::Quiz {
            self.quizzes_completed = self.quizzes_completed.saturating_add(1);
        }
        self.mastery_percent = all_time_accuracy.min(100);
        self.touch_day(summary.completed_at().date_naive());
    }

    fn touch_day(&mut self, day: NaiveDate) {
        match self.last_active_on {
            Some(last) if last >= day => {
                if self.streak_days == 0 {
                    self.streak_days = 1;
                }
                // same day (or a clock that went backwards): keep the later date
                return;
            }
            Some(last) if day.pred_opt() == Some(last) => {
                self.streak_days = self.streak_days.saturating_add(1);
            }
            _ => self.streak_days = 1,
        }
        self.last_active_on = Some(day);
    }
}
