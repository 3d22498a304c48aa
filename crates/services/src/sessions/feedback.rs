use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use vocab_core::model::Question;

pub const CORRECT_MESSAGES: [&str; 6] = [
    "Great job!",
    "Correct!",
    "Well done!",
    "Excellent!",
    "You got it!",
    "Nice work!",
];

pub const INCORRECT_MESSAGES: [&str; 5] = [
    "Not quite.",
    "Almost there!",
    "Keep trying!",
    "Not this time.",
    "Good effort, but that's not it.",
];

/// Streak lengths that earn an extra message, ascending.
pub const STREAK_MILESTONES: [(u32, &str); 4] = [
    (3, "Three in a row!"),
    (5, "Five in a row, you're on fire!"),
    (8, "Eight straight, unstoppable!"),
    (10, "Ten in a row, perfect focus!"),
];

/// Message for the highest milestone `streak` has reached, if any.
#[must_use]
pub fn streak_milestone(streak: u32) -> Option<&'static str> {
    STREAK_MILESTONES
        .iter()
        .rev()
        .find(|(threshold, _)| streak >= *threshold)
        .map(|(_, message)| *message)
}

/// Feedback shown after one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub is_correct: bool,
    pub message: &'static str,
    /// Set only for incorrect answers.
    pub correct_answer: Option<String>,
    /// Set only for incorrect answers with a non-empty explanation.
    pub explanation: Option<String>,
    pub streak_message: Option<&'static str>,
}

/// Picks feedback phrases from fixed pools.
///
/// The random source is owned so tests can seed it.
#[derive(Debug, Clone)]
pub struct FeedbackGenerator {
    rng: StdRng,
}

impl FeedbackGenerator {
    /// Generator seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Builds feedback for one answer; `streak` is the streak after the answer.
    pub fn generate(&mut self, is_correct: bool, question: &Question, streak: u32) -> Feedback {
        let pool: &[&'static str] = if is_correct {
            &CORRECT_MESSAGES
        } else {
            &INCORRECT_MESSAGES
        };
        let message = pool.choose(&mut self.rng).copied().unwrap_or_default();

        if is_correct {
            return Feedback {
                is_correct,
                message,
                correct_answer: None,
                explanation: None,
                streak_message: streak_milestone(streak),
            };
        }

        let explanation = Some(question.explanation())
            .filter(|text| !text.is_empty())
            .map(str::to_owned);
        Feedback {
            is_correct,
            message,
            correct_answer: Some(question.correct_answer_text()),
            explanation,
            streak_message: None,
        }
    }
}

impl Default for FeedbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}
