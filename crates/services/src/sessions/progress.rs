use vocab_core::model::Score;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
    pub score: Score,
    pub streak: u32,
    pub highest_streak: u32,
}

impl SessionProgress {
    /// Rounded share of correct answers among resolved questions.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.score.percentage()
    }
}
