use serde::{Deserialize, Serialize};

/// Rounded percentage of `part` over `total`, half rounding up.
///
/// An empty denominator yields 0 instead of dividing by zero.
#[must_use]
pub fn percentage(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (u128::from(part) * 200 + u128::from(total)) / (u128::from(total) * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Running tally for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
    pub skipped: u32,
}

impl Score {
    /// Questions that have been resolved one way or another.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct
            .saturating_add(self.incorrect)
            .saturating_add(self.skipped)
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        percentage(u64::from(self.correct), u64::from(self.total()))
    }

    pub fn record_correct(&mut self) {
        self.correct = self.correct.saturating_add(1);
    }

    pub fn record_incorrect(&mut self) {
        self.incorrect = self.incorrect.saturating_add(1);
    }

    pub fn record_skip(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_total_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(Score::default().percentage(), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn total_includes_skips() {
        let mut score = Score::default();
        score.record_correct();
        score.record_incorrect();
        score.record_skip();
        assert_eq!(score.total(), 3);
        assert_eq!(score.percentage(), 33);
    }
}
