use storage::repository::{ProgressRepository, QuestionRepository, SnapshotRepository};
use storage::seed::builtin_questions;
use storage::sqlite::SqliteRepository;
use vocab_core::model::{
    EngineSnapshot, ProgressCounters, QuestionId, QuestionType, SessionMode,
};

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_question_bank_filters_by_kind() {
    let repo = connect("memdb_questions").await;
    let questions = builtin_questions().unwrap();
    for q in &questions {
        repo.upsert_question(q).await.unwrap();
    }

    assert_eq!(repo.count_questions().await.unwrap(), questions.len() as u64);

    let tf = repo.list_questions(&[QuestionType::TrueFalse]).await.unwrap();
    assert!(!tf.is_empty());
    assert!(tf.iter().all(|q| q.question_type() == QuestionType::TrueFalse));

    let mixed = repo
        .list_questions(&[QuestionType::Matching, QuestionType::FillInBlank])
        .await
        .unwrap();
    let expected = questions
        .iter()
        .filter(|q| {
            matches!(
                q.question_type(),
                QuestionType::Matching | QuestionType::FillInBlank
            )
        })
        .count();
    assert_eq!(mixed.len(), expected);
    assert!(mixed.windows(2).all(|w| w[0].id() < w[1].id()));
}

#[tokio::test]
async fn sqlite_upsert_replaces_existing_question() {
    let repo = connect("memdb_upsert").await;
    let questions = builtin_questions().unwrap();
    let first = questions[0].clone();
    repo.upsert_question(&first).await.unwrap();
    repo.upsert_question(&first).await.unwrap();
    assert_eq!(repo.count_questions().await.unwrap(), 1);

    let fetched = repo.list_questions(&QuestionType::ALL).await.unwrap();
    assert_eq!(fetched[0].id(), QuestionId::new(1));
    assert_eq!(fetched[0], first);
}

#[tokio::test]
async fn sqlite_snapshot_and_progress_round_trip() {
    let repo = connect("memdb_kv").await;
    assert!(repo.load_snapshot().await.unwrap().is_none());
    assert_eq!(repo.load_counters().await.unwrap(), ProgressCounters::default());

    let mut snapshot = EngineSnapshot::default();
    snapshot.settings = snapshot.settings.with_mode(SessionMode::Quiz);
    repo.save_snapshot(&snapshot).await.unwrap();
    // second save overwrites rather than duplicating
    repo.save_snapshot(&snapshot).await.unwrap();
    assert_eq!(repo.load_snapshot().await.unwrap(), Some(snapshot));

    let counters = ProgressCounters {
        words_learned: 42,
        quizzes_completed: 3,
        mastery_percent: 71,
        streak_days: 2,
        last_active_on: None,
    };
    repo.save_counters(&counters).await.unwrap();
    assert_eq!(repo.load_counters().await.unwrap(), counters);
}
