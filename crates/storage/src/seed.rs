//! Built-in vocabulary questions used to seed an empty question bank.

use vocab_core::model::{AnswerOption, MatchPair, Question, QuestionError, QuestionId, QuestionKind};

fn choice(
    id: u64,
    prompt: &str,
    options: &[(&str, &str)],
    correct: &str,
    explanation: &str,
) -> Result<Question, QuestionError> {
    Question::new(
        QuestionId::new(id),
        prompt,
        options
            .iter()
            .map(|(id, text)| AnswerOption::new(*id, *text))
            .collect(),
        explanation,
        QuestionKind::MultipleChoice {
            correct_option_id: correct.to_owned(),
        },
    )
}

fn true_false(id: u64, prompt: &str, is_true: bool, explanation: &str) -> Result<Question, QuestionError> {
    Question::new(
        QuestionId::new(id),
        prompt,
        vec![
            AnswerOption::new("true", "True"),
            AnswerOption::new("false", "False"),
        ],
        explanation,
        QuestionKind::TrueFalse {
            is_true,
            correct_option_id: if is_true { "true" } else { "false" }.to_owned(),
        },
    )
}

fn blank(
    id: u64,
    prompt: &str,
    options: &[(&str, &str)],
    correct: &str,
    explanation: &str,
) -> Result<Question, QuestionError> {
    let answer = options
        .iter()
        .find(|(option_id, _)| *option_id == correct)
        .map(|(_, text)| (*text).to_owned())
        .unwrap_or_default();
    Question::new(
        QuestionId::new(id),
        prompt,
        options
            .iter()
            .map(|(id, text)| AnswerOption::new(*id, *text))
            .collect(),
        explanation,
        QuestionKind::FillInBlank {
            blanks: vec![answer],
            correct_option_id: correct.to_owned(),
        },
    )
}

fn matching(id: u64, prompt: &str, pairs: &[(&str, &str, &str)], decoys: &[(&str, &str)]) -> Result<Question, QuestionError> {
    let mut options: Vec<AnswerOption> = pairs
        .iter()
        .map(|(id, left, right)| AnswerOption::new(*id, format!("{left} / {right}")))
        .collect();
    options.extend(decoys.iter().map(|(id, text)| AnswerOption::new(*id, *text)));
    let correct = pairs.iter().map(|(id, _, _)| *id).collect::<Vec<_>>().join(",");
    Question::new(
        QuestionId::new(id),
        prompt,
        options,
        "",
        QuestionKind::Matching {
            pairs: pairs
                .iter()
                .map(|(id, left, right)| MatchPair::new(*id, *left, *right))
                .collect(),
            correct_option_id: correct,
        },
    )
}

/// The starter question bank.
///
/// # Errors
///
/// Returns `QuestionError` if an entry fails validation.
pub fn builtin_questions() -> Result<Vec<Question>, QuestionError> {
    Ok(vec![
        choice(
            1,
            "What does 'ephemeral' mean?",
            &[("a", "Lasting forever"), ("b", "Short-lived"), ("c", "Very loud"), ("d", "Colourful")],
            "b",
            "From Greek 'ephemeros', lasting only a day.",
        )?,
        choice(
            2,
            "Which word is a synonym of 'candid'?",
            &[("a", "Frank"), ("b", "Sweet"), ("c", "Hidden"), ("d", "Careful")],
            "a",
            "A candid remark is open and honest.",
        )?,
        choice(
            3,
            "Pick the antonym of 'benevolent'.",
            &[("a", "Kind"), ("b", "Generous"), ("c", "Malevolent"), ("d", "Lenient")],
            "c",
            "'Bene' means well, 'male' means badly.",
        )?,
        choice(
            4,
            "What does 'ubiquitous' describe?",
            &[("a", "Something rare"), ("b", "Something everywhere"), ("c", "Something ancient"), ("d", "Something fragile")],
            "b",
            "",
        )?,
        true_false(5, "'Gregarious' means fond of company.", true, "Gregarious people enjoy being with others.")?,
        true_false(6, "'Laconic' means using many words.", false, "Laconic speech is brief and concise.")?,
        true_false(7, "'Meticulous' means very careful about detail.", true, "")?,
        blank(
            8,
            "She was ___ to leave the party early, but she had to.",
            &[("a", "reluctant"), ("b", "eager"), ("c", "relieved")],
            "a",
            "Reluctant means unwilling or hesitant.",
        )?,
        blank(
            9,
            "The scientist's ___ research won her the prize.",
            &[("a", "mundane"), ("b", "pioneering"), ("c", "sloppy")],
            "b",
            "Pioneering work is the first of its kind.",
        )?,
        blank(
            10,
            "His ___ attitude annoyed the whole team.",
            &[("a", "arrogant"), ("b", "humble"), ("c", "modest")],
            "a",
            "",
        )?,
        matching(
            11,
            "Match each word with its meaning.",
            &[("a", "Verbose", "Wordy"), ("b", "Terse", "Brief"), ("c", "Lucid", "Clear")],
            &[("d", "Lucid / Dark"), ("e", "Terse / Long")],
        )?,
        matching(
            12,
            "Match each French word with its English translation.",
            &[("a", "chien", "dog"), ("d", "chat", "cat"), ("f", "oiseau", "bird")],
            &[("b", "chien / cow"), ("c", "chat / fish"), ("e", "oiseau / horse")],
        )?,
    ])
}
