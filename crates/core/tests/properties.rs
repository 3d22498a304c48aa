//! Property tests for the pure domain rules:
//! - matching answers use set semantics
//! - history stays bounded while all-time totals keep counting
//! - achievement progress stays in range and unlocks never regress

use std::collections::BTreeSet;

use proptest::prelude::*;
use vocab_core::model::{
    Achievement, AchievementCategory, AchievementLevel, AnswerOption, HISTORY_CAPACITY,
    LOCKED_PROGRESS_CAP, ProgressCounters, Question, QuestionId, QuestionKind, SessionHistory,
    SessionId, SessionMode, SessionSummary, check_achievements,
};
use vocab_core::time::fixed_now;

const OPTION_IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn matching_question(correct: &[&str]) -> Question {
    let options = OPTION_IDS
        .iter()
        .map(|id| AnswerOption::new(*id, id.to_uppercase()))
        .collect();
    Question::new(
        QuestionId::new(1),
        "Match",
        options,
        "",
        QuestionKind::Matching {
            pairs: Vec::new(),
            correct_option_id: correct.join(","),
        },
    )
    .unwrap()
}

fn arb_correct_set() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(OPTION_IDS.to_vec(), 1..=OPTION_IDS.len())
}

proptest! {
    #[test]
    fn matching_ignores_submission_order(
        correct in arb_correct_set(),
        seed in any::<u64>(),
    ) {
        let question = matching_question(&correct);
        let mut shuffled = correct.clone();
        // deterministic rotation keyed by the seed
        let len = shuffled.len();
        shuffled.rotate_left(usize::try_from(seed % len as u64).unwrap());
        shuffled.reverse();
        prop_assert!(question.is_correct(&shuffled.join(",")));
    }

    #[test]
    fn matching_rejects_size_mismatch(
        correct in arb_correct_set(),
        submitted in proptest::sample::subsequence(OPTION_IDS.to_vec(), 0..=OPTION_IDS.len()),
    ) {
        let question = matching_question(&correct);
        let expected: BTreeSet<_> = correct.iter().copied().collect();
        let given: BTreeSet<_> = submitted.iter().copied().collect();
        prop_assert_eq!(question.is_correct(&submitted.join(",")), given == expected);
        if given.len() != expected.len() {
            prop_assert!(!question.is_correct(&submitted.join(",")));
        }
    }

    #[test]
    fn history_is_bounded_and_totals_are_complete(
        sessions in proptest::collection::vec((0u32..=10, 0u32..=10), 0..60),
    ) {
        let mut history = SessionHistory::new();
        let mut correct_sum = 0u64;
        let mut total_sum = 0u64;
        for (a, b) in sessions.iter().copied() {
            let (correct, total) = (a.min(b), a.max(b));
            correct_sum += u64::from(correct);
            total_sum += u64::from(total);
            let summary = SessionSummary::new(
                SessionId::generate(),
                SessionMode::Quiz,
                fixed_now(),
                correct,
                total,
                0,
                BTreeSet::new(),
                0,
            )
            .unwrap();
            history.record(summary);
            prop_assert!(history.len() <= HISTORY_CAPACITY);
        }
        prop_assert_eq!(history.all_time().correct, correct_sum);
        prop_assert_eq!(history.all_time().total, total_sum);
        prop_assert_eq!(history.all_time().sessions, sessions.len() as u64);
        prop_assert!(history.accuracy() <= 100);
    }

    #[test]
    fn achievement_progress_stays_in_range(
        requirement in 1u32..1_000,
        counters in proptest::collection::vec(0u32..2_000, 1..20),
    ) {
        let mut list = vec![Achievement::new(
            "words",
            "Words",
            AchievementCategory::Words,
            AchievementLevel::Silver,
            requirement,
        )];
        let mut unlocked_once = false;
        for words_learned in counters {
            let snapshot = ProgressCounters { words_learned, ..ProgressCounters::default() };
            let newly = check_achievements(&mut list, &snapshot, fixed_now());
            if unlocked_once {
                prop_assert!(newly.is_empty());
            }
            if list[0].is_unlocked() {
                unlocked_once = true;
                prop_assert_eq!(list[0].progress(), 100);
            } else {
                prop_assert!(list[0].progress() <= LOCKED_PROGRESS_CAP);
            }
        }
    }
}
