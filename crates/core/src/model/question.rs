use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question must offer at least one option")]
    NoOptions,

    #[error("duplicate option id: {0}")]
    DuplicateOption(String),

    #[error("correct answer references unknown option id: {0}")]
    DanglingAnswer(String),

    #[error("matching question needs at least one correct pair")]
    EmptyMatchingAnswer,

    #[error("unknown question type: {0}")]
    UnknownType(String),
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// The four exercise shapes a session can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    Matching,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillInBlank,
        QuestionType::Matching,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillInBlank => "fill_in_blank",
            QuestionType::Matching => "matching",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| QuestionError::UnknownType(s.to_owned()))
    }
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// One selectable answer (id + display text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A left/right pair shown by a matching exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub id: String,
    pub left: String,
    pub right: String,
}

impl MatchPair {
    #[must_use]
    pub fn new(id: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Kind-specific payload of a question.
///
/// Matching questions store their correct answer as a comma-joined set of
/// option ids; every other kind stores a single option id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        correct_option_id: String,
    },
    TrueFalse {
        is_true: bool,
        correct_option_id: String,
    },
    FillInBlank {
        blanks: Vec<String>,
        correct_option_id: String,
    },
    Matching {
        pairs: Vec<MatchPair>,
        correct_option_id: String,
    },
}

impl QuestionKind {
    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::FillInBlank { .. } => QuestionType::FillInBlank,
            QuestionKind::Matching { .. } => QuestionType::Matching,
        }
    }

    #[must_use]
    pub fn correct_option_id(&self) -> &str {
        match self {
            QuestionKind::MultipleChoice { correct_option_id }
            | QuestionKind::TrueFalse {
                correct_option_id, ..
            }
            | QuestionKind::FillInBlank {
                correct_option_id, ..
            }
            | QuestionKind::Matching {
                correct_option_id, ..
            } => correct_option_id,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct QuestionRecord {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    #[serde(default)]
    explanation: String,
    #[serde(flatten)]
    kind: QuestionKind,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        Question::new(
            record.id,
            record.prompt,
            record.options,
            record.explanation,
            record.kind,
        )
    }
}

/// A validated exercise question.
///
/// Construction guarantees every correct-answer id references an option, so
/// correctness checks never see a dangling id from well-formed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    explanation: String,
    #[serde(flatten)]
    kind: QuestionKind,
}

impl Question {
    /// Builds a question after checking its answer references.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, options are missing or
    /// duplicated, or the correct answer names an id absent from `options`.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        explanation: impl Into<String>,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.id.as_str()) {
                return Err(QuestionError::DuplicateOption(option.id.clone()));
            }
        }

        match &kind {
            QuestionKind::Matching {
                correct_option_id, ..
            } => {
                let ids = split_ids(correct_option_id);
                if ids.is_empty() {
                    return Err(QuestionError::EmptyMatchingAnswer);
                }
                if let Some(missing) = ids.into_iter().find(|id| !seen.contains(id)) {
                    return Err(QuestionError::DanglingAnswer(missing.to_owned()));
                }
            }
            other => {
                let correct = other.correct_option_id();
                if !seen.contains(correct) {
                    return Err(QuestionError::DanglingAnswer(correct.to_owned()));
                }
            }
        }

        Ok(Self {
            id,
            prompt,
            options,
            explanation: explanation.into(),
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// Checks a submitted answer id against this question.
    ///
    /// Matching questions compare id sets: order does not matter, but the
    /// submission must name exactly as many distinct ids as the answer.
    #[must_use]
    pub fn is_correct(&self, submitted: &str) -> bool {
        match &self.kind {
            QuestionKind::Matching {
                correct_option_id, ..
            } => {
                let expected = split_ids(correct_option_id);
                let given = split_ids(submitted);
                given.len() == expected.len() && given.is_subset(&expected)
            }
            other => submitted == other.correct_option_id(),
        }
    }

    /// Human-readable form of the correct answer.
    ///
    /// Returns an empty string if a multiple-choice answer id has no option
    /// (unreachable for questions built through `Question::new`).
    #[must_use]
    pub fn correct_answer_text(&self) -> String {
        match &self.kind {
            QuestionKind::MultipleChoice { correct_option_id } => self
                .options
                .iter()
                .find(|opt| &opt.id == correct_option_id)
                .map(|opt| opt.text.clone())
                .unwrap_or_default(),
            QuestionKind::TrueFalse { is_true, .. } => {
                String::from(if *is_true { "True" } else { "False" })
            }
            QuestionKind::FillInBlank { blanks, .. } => blanks.first().cloned().unwrap_or_default(),
            QuestionKind::Matching { pairs, .. } => pairs
                .iter()
                .map(|pair| format!("{} → {}", pair.left, pair.right))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn split_ids(raw: &str) -> BTreeSet<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
