use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{SeedableRng, rng};
use std::sync::Arc;

use storage::repository::QuestionRepository;
use vocab_core::model::{Question, QuestionType, SessionSettings};

use crate::error::SessionError;

/// Picks the questions for a single run from a question source.
#[derive(Clone)]
pub struct QuestionPool {
    questions: Arc<dyn QuestionRepository>,
    seed: Option<u64>,
}

impl QuestionPool {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self {
            questions,
            seed: None,
        }
    }

    /// Use a fixed shuffle seed for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fetch questions of the enabled types, shuffle them and cap at the
    /// configured count.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no stored question matches.
    /// Returns `SessionError::Storage` if the source cannot be read.
    pub async fn draw(&self, settings: &SessionSettings) -> Result<Vec<Question>, SessionError> {
        let types: Vec<QuestionType> = settings.question_types().iter().copied().collect();
        let drawn = self.get_questions(&types, settings.question_count()).await?;
        if drawn.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(drawn)
    }

    /// Shuffled sample of up to `count` questions of the given kinds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the source cannot be read.
    pub async fn get_questions(
        &self,
        types: &[QuestionType],
        count: u32,
    ) -> Result<Vec<Question>, SessionError> {
        let candidates = self.questions.list_questions(types).await?;
        let available = candidates.len();
        let drawn = self.select(candidates, count);
        tracing::debug!(available, drawn = drawn.len(), "questions drawn");
        Ok(drawn)
    }

    fn select(&self, mut candidates: Vec<Question>, count: u32) -> Vec<Question> {
        match self.seed {
            Some(seed) => candidates.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => candidates.shuffle(&mut rng()),
        }
        candidates.truncate(usize::try_from(count).unwrap_or(usize::MAX));
        candidates
    }
}
