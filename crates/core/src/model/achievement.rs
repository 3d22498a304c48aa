use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::progress::ProgressCounters;
use crate::model::score::percentage;

/// Highest progress a locked achievement may report.
pub const LOCKED_PROGRESS_CAP: u8 = 99;

/// Id of the special achievement granted for a flawless session.
pub const PERFECT_SESSION_ID: &str = "perfect_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Streak,
    Words,
    Quizzes,
    Mastery,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Deserialize)]
struct AchievementRecord {
    id: String,
    title: String,
    category: AchievementCategory,
    level: AchievementLevel,
    requirement: u32,
    #[serde(default)]
    progress: u8,
    #[serde(default)]
    unlocked_at: Option<DateTime<Utc>>,
}

impl From<AchievementRecord> for Achievement {
    fn from(r: AchievementRecord) -> Self {
        let progress = if r.unlocked_at.is_some() {
            100
        } else {
            r.progress.min(LOCKED_PROGRESS_CAP)
        };
        Self {
            id: r.id,
            title: r.title,
            category: r.category,
            level: r.level,
            requirement: r.requirement,
            progress,
            unlocked_at: r.unlocked_at,
        }
    }
}

/// A milestone gated on one progress counter.
///
/// Unlocking is one-way: an unlocked achievement reports 100 % forever, a
/// locked one never reports more than `LOCKED_PROGRESS_CAP`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AchievementRecord")]
pub struct Achievement {
    id: String,
    title: String,
    category: AchievementCategory,
    level: AchievementLevel,
    requirement: u32,
    progress: u8,
    unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: AchievementCategory,
        level: AchievementLevel,
        requirement: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            level,
            requirement,
            progress: 0,
            unlocked_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn category(&self) -> AchievementCategory {
        self.category
    }

    #[must_use]
    pub fn level(&self) -> AchievementLevel {
        self.level
    }

    #[must_use]
    pub fn requirement(&self) -> u32 {
        self.requirement
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn unlocked_at(&self) -> Option<DateTime<Utc>> {
        self.unlocked_at
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }

    /// Unlocks the achievement. Returns `false` if it was already unlocked.
    pub fn unlock(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_unlocked() {
            return false;
        }
        self.unlocked_at = Some(now);
        self.progress = 100;
        true
    }

    fn track(&mut self, counter: u32) {
        let pct = percentage(u64::from(counter), u64::from(self.requirement));
        self.progress = u8::try_from(pct.min(u32::from(LOCKED_PROGRESS_CAP)))
            .unwrap_or(LOCKED_PROGRESS_CAP);
    }
}

/// Evaluates every locked achievement against the counters.
///
/// Returns the achievements that unlocked during this call. Already unlocked
/// entries are never revisited, so a counter that later drops has no effect.
pub fn check_achievements(
    achievements: &mut [Achievement],
    counters: &ProgressCounters,
    now: DateTime<Utc>,
) -> Vec<Achievement> {
    let mut newly_unlocked = Vec::new();
    for achievement in achievements.iter_mut().filter(|a| !a.is_unlocked()) {
        let Some(counter) = counters.counter_for(achievement.category) else {
            continue;
        };
        if counter >= achievement.requirement {
            achievement.unlock(now);
            newly_unlocked.push(achievement.clone());
        } else {
            achievement.track(counter);
        }
    }
    newly_unlocked
}

/// The built-in milestone table.
#[must_use]
pub fn default_achievements() -> Vec<Achievement> {
    use AchievementCategory::{Mastery, Quizzes, Special, Streak, Words};
    use AchievementLevel::{Bronze, Gold, Platinum, Silver};

    let table: [(&str, &str, AchievementCategory, AchievementLevel, u32); 17] = [
        ("streak_3", "Warming Up", Streak, Bronze, 3),
        ("streak_7", "Week Strong", Streak, Silver, 7),
        ("streak_30", "Habit Formed", Streak, Gold, 30),
        ("streak_100", "Unstoppable", Streak, Platinum, 100),
        ("words_10", "First Words", Words, Bronze, 10),
        ("words_50", "Word Collector", Words, Silver, 50),
        ("words_200", "Lexicon Builder", Words, Gold, 200),
        ("words_500", "Walking Dictionary", Words, Platinum, 500),
        ("quizzes_1", "First Quiz", Quizzes, Bronze, 1),
        ("quizzes_10", "Quiz Regular", Quizzes, Silver, 10),
        ("quizzes_50", "Quiz Veteran", Quizzes, Gold, 50),
        ("quizzes_100", "Quiz Master", Quizzes, Platinum, 100),
        ("mastery_25", "Getting There", Mastery, Bronze, 25),
        ("mastery_50", "Half Way", Mastery, Silver, 50),
        ("mastery_75", "Sharp Mind", Mastery, Gold, 75),
        ("mastery_100", "Flawless Record", Mastery, Platinum, 100),
        (PERFECT_SESSION_ID, "Perfect Session", Special, Gold, 1),
    ];

    table
        .into_iter()
        .map(|(id, title, category, level, requirement)| {
            Achievement::new(id, title, category, level, requirement)
        })
        .collect()
}
