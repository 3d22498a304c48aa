use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::model::score::percentage;
use crate::model::session::SessionSummary;

/// Number of summaries kept for display.
pub const HISTORY_CAPACITY: usize = 20;

/// All-time answer totals, independent of which summaries are still retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllTimeTotals {
    pub sessions: u64,
    pub correct: u64,
    pub total: u64,
}

impl AllTimeTotals {
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        percentage(self.correct, self.total)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SessionHistoryRecord {
    #[serde(default)]
    entries: VecDeque<SessionSummary>,
    #[serde(default)]
    all_time: AllTimeTotals,
}

impl From<SessionHistoryRecord> for SessionHistory {
    fn from(record: SessionHistoryRecord) -> Self {
        let mut entries = record.entries;
        entries.truncate(HISTORY_CAPACITY);
        Self {
            entries,
            all_time: record.all_time,
        }
    }
}

/// Most recent session summaries (newest first) plus running all-time totals.
///
/// The retained list evicts its oldest entry once it holds `HISTORY_CAPACITY`
/// summaries; the totals keep counting every session ever recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SessionHistoryRecord")]
pub struct SessionHistory {
    entries: VecDeque<SessionSummary>,
    all_time: AllTimeTotals,
}

impl SessionHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, summary: SessionSummary) {
        self.all_time.sessions = self.all_time.sessions.saturating_add(1);
        self.all_time.correct = self
            .all_time
            .correct
            .saturating_add(u64::from(summary.correct()));
        self.all_time.total = self.all_time.total.saturating_add(u64::from(summary.total()));

        self.entries.push_front(summary);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    /// Retained summaries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &SessionSummary> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&SessionSummary> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn all_time(&self) -> AllTimeTotals {
        self.all_time
    }

    /// All-time accuracy in percent.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        self.all_time.accuracy()
    }
}
