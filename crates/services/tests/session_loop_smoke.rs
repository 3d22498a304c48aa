use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;
use services::{Clock, LoopStep, SessionError, SessionLoopService, SessionPhase};
use storage::repository::{
    InMemoryRepository, ProgressRepository, QuestionRepository, SnapshotRepository, StorageError,
};
use vocab_core::model::{
    AnswerOption, EngineSnapshot, Question, QuestionId, QuestionKind, QuestionType, SessionMode,
    SessionSettings,
};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use vocab_core::time::fixed_now;

fn mc(id: u64) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Translate word {id}"),
        vec![
            AnswerOption::new("a", "right"),
            AnswerOption::new("b", "wrong"),
            AnswerOption::new("c", "also wrong"),
        ],
        "",
        QuestionKind::MultipleChoice {
            correct_option_id: "a".into(),
        },
    )
    .unwrap()
}

fn practice_settings() -> SessionSettings {
    SessionSettings::new(
        SessionMode::Practice,
        3,
        [QuestionType::MultipleChoice].into_iter().collect(),
        false,
        1500,
    )
    .unwrap()
}

/// Snapshot store whose writes fail until switched back on.
#[derive(Clone, Default)]
struct FlakySnapshots {
    inner: InMemoryRepository,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl SnapshotRepository for FlakySnapshots {
    async fn load_snapshot(&self) -> Result<Option<EngineSnapshot>, StorageError> {
        self.inner.load_snapshot().await
    }

    async fn save_snapshot(&self, snapshot: &EngineSnapshot) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk unavailable".into()));
        }
        self.inner.save_snapshot(snapshot).await
    }
}

/// Snapshot store that takes `delay` to write.
#[derive(Clone)]
struct SlowSnapshots {
    inner: InMemoryRepository,
    delay: Duration,
}

#[async_trait]
impl SnapshotRepository for SlowSnapshots {
    async fn load_snapshot(&self) -> Result<Option<EngineSnapshot>, StorageError> {
        self.inner.load_snapshot().await
    }

    async fn save_snapshot(&self, snapshot: &EngineSnapshot) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.save_snapshot(snapshot).await
    }
}

#[derive(Clone, Default)]
struct LogBuffer {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct LogBufferGuard {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferGuard {
            buffer: self.buffer.clone(),
        }
    }
}

impl Write for LogBufferGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer
            .lock()
            .expect("log buffer")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.buffer.lock().expect("log buffer").clone()).expect("utf8 logs")
    }
}

fn auto_advance_settings(count: u32) -> SessionSettings {
    SessionSettings::new(
        SessionMode::Practice,
        count,
        [QuestionType::MultipleChoice].into_iter().collect(),
        true,
        1500,
    )
    .unwrap()
}

fn slow_service(repo: &InMemoryRepository, snapshots: &SlowSnapshots) -> SessionLoopService {
    SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(snapshots.clone()),
        Arc::new(repo.clone()),
    )
}

struct BrokenQuestions;

#[async_trait]
impl QuestionRepository for BrokenQuestions {
    async fn upsert_question(&self, _question: &Question) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn list_questions(&self, _types: &[QuestionType]) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn three_question_run_scores_and_persists() {
    let repo = InMemoryRepository::with_questions((1..=3).map(mc));
    let loop_svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_seed(42);

    let mut engine = loop_svc.new_engine(practice_settings());
    assert_eq!(loop_svc.start_session(&mut engine).await.unwrap(), 3);

    let mut completion = None;
    for answer in ["a", "b", "a"] {
        loop_svc.submit_answer(&mut engine, answer).unwrap();
        if let LoopStep::Completed(done) = loop_svc.advance(&mut engine).await.unwrap() {
            completion = Some(*done);
        }
    }

    let completion = completion.expect("run completed");
    let score = engine.score();
    assert_eq!((score.correct, score.incorrect, score.skipped), (2, 1, 0));
    assert_eq!(completion.summary.total(), 3);
    assert_eq!(completion.summary.highest_streak(), 1);
    assert_eq!(completion.summary.percentage(), 67);
    assert_eq!(completion.counters.words_learned, 2);

    let snapshot = repo.load_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.history.latest(), Some(&completion.summary));
    assert_eq!(snapshot.history.all_time().correct, 2);
}

#[tokio::test]
async fn failed_start_leaves_engine_untouched() {
    let repo = InMemoryRepository::new();
    let loop_svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(BrokenQuestions),
        Arc::new(repo.clone()),
        Arc::new(repo),
    );
    let mut engine = loop_svc.new_engine(practice_settings());

    let err = loop_svc.start_session(&mut engine).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));
    assert_eq!(engine.phase(), SessionPhase::NotStarted);
    assert!(engine.questions().is_empty());
    assert!(engine.session_id().is_none());
}

#[tokio::test]
async fn failed_save_can_be_retried_once() {
    let repo = InMemoryRepository::with_questions((1..=2).map(mc));
    let snapshots = FlakySnapshots::default();
    snapshots.failing.store(true, Ordering::SeqCst);
    let loop_svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(snapshots.clone()),
        Arc::new(repo.clone()),
    );

    let mut engine = loop_svc.new_engine(practice_settings());
    loop_svc.start_session(&mut engine).await.unwrap();
    loop_svc.submit_answer(&mut engine, "a").unwrap();
    loop_svc.advance(&mut engine).await.unwrap();
    loop_svc.submit_answer(&mut engine, "a").unwrap();

    let err = loop_svc.advance(&mut engine).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));
    assert!(engine.is_complete());
    assert!(snapshots.load_snapshot().await.unwrap().is_none());
    assert_eq!(repo.load_counters().await.unwrap().words_learned, 0);

    snapshots.failing.store(false, Ordering::SeqCst);
    let completion = loop_svc
        .finalize_summary(&mut engine)
        .await
        .unwrap()
        .expect("recorded on retry");
    assert_eq!(completion.all_time.sessions, 1);
    assert!(loop_svc.finalize_summary(&mut engine).await.unwrap().is_none());

    let snapshot = snapshots.load_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn input_racing_the_timer_does_not_interrupt_recording() {
    let repo = InMemoryRepository::with_questions([mc(1)]);
    let snapshots = SlowSnapshots {
        inner: InMemoryRepository::new(),
        delay: Duration::from_millis(400),
    };
    let loop_svc = slow_service(&repo, &snapshots);
    let mut engine = loop_svc.new_engine(auto_advance_settings(1));
    loop_svc.start_session(&mut engine).await.unwrap();
    loop_svc.submit_answer(&mut engine, "a").unwrap();
    let deadline = engine.auto_advance_deadline().expect("auto-advance scheduled");

    // input lands while the snapshot is still being written
    let keypress = tokio::time::sleep(Duration::from_millis(1600));
    tokio::pin!(keypress);
    let timer_fired = tokio::select! {
        () = loop_svc.sleep_until(deadline) => true,
        () = &mut keypress => false,
    };
    assert!(timer_fired);

    let step = loop_svc.fire_auto_advance(&mut engine).await.unwrap();
    assert!(matches!(step, LoopStep::Completed(_)));
    keypress.await;
    assert_eq!(loop_svc.advance(&mut engine).await.unwrap(), LoopStep::Ignored);

    let snapshot = snapshots.load_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(repo.load_counters().await.unwrap().words_learned, 1);
    assert!(loop_svc.finalize_summary(&mut engine).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn early_input_leaves_pending_auto_advance_alone() {
    let repo = InMemoryRepository::with_questions((1..=2).map(mc));
    let snapshots = SlowSnapshots {
        inner: InMemoryRepository::new(),
        delay: Duration::from_millis(400),
    };
    let loop_svc = slow_service(&repo, &snapshots);
    let mut engine = loop_svc.new_engine(auto_advance_settings(2));
    loop_svc.start_session(&mut engine).await.unwrap();
    loop_svc.submit_answer(&mut engine, "a").unwrap();
    let deadline = engine.auto_advance_deadline().expect("auto-advance scheduled");

    let timer_fired = tokio::select! {
        () = loop_svc.sleep_until(deadline) => true,
        () = tokio::time::sleep(Duration::from_millis(200)) => false,
    };
    assert!(!timer_fired);
    assert_eq!(engine.cursor(), 0);
    assert_eq!(engine.auto_advance_deadline(), Some(deadline));

    assert_eq!(
        loop_svc.advance(&mut engine).await.unwrap(),
        LoopStep::Moved { cursor: 1 }
    );
    assert_eq!(engine.auto_advance_deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn interrupted_recording_is_finished_by_finalize() {
    let repo = InMemoryRepository::with_questions([mc(1)]);
    let snapshots = SlowSnapshots {
        inner: InMemoryRepository::new(),
        delay: Duration::from_millis(400),
    };
    let loop_svc = slow_service(&repo, &snapshots);
    let mut engine = loop_svc.new_engine(auto_advance_settings(1));
    loop_svc.start_session(&mut engine).await.unwrap();
    loop_svc.submit_answer(&mut engine, "a").unwrap();

    // dropped while the snapshot write is in flight
    let interrupted = tokio::time::timeout(
        Duration::from_millis(1600),
        loop_svc.wait_auto_advance(&mut engine),
    )
    .await;
    assert!(interrupted.is_err());
    assert!(engine.is_complete());
    assert!(snapshots.load_snapshot().await.unwrap().is_none());

    let completion = loop_svc
        .finalize_summary(&mut engine)
        .await
        .unwrap()
        .expect("recorded after interruption");
    assert_eq!(completion.all_time.sessions, 1);
    let snapshot = snapshots.load_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test]
async fn failed_recording_is_logged_as_warning() {
    let repo = InMemoryRepository::with_questions([mc(1)]);
    let snapshots = FlakySnapshots::default();
    snapshots.failing.store(true, Ordering::SeqCst);
    let loop_svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(snapshots.clone()),
        Arc::new(repo),
    );
    let settings = SessionSettings::new(
        SessionMode::Practice,
        1,
        [QuestionType::MultipleChoice].into_iter().collect(),
        false,
        1500,
    )
    .unwrap();
    let mut engine = loop_svc.new_engine(settings);
    loop_svc.start_session(&mut engine).await.unwrap();
    loop_svc.submit_answer(&mut engine, "a").unwrap();

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let err = loop_svc.advance(&mut engine).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));
    let err = loop_svc.finalize_summary(&mut engine).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));

    let logs = logs.contents();
    assert_eq!(logs.matches("could not record completed session").count(), 2);
    assert!(logs.contains("disk unavailable"));
    let session_id = engine.session_id().expect("started").to_string();
    assert!(logs.contains(&session_id));
}

proptest! {
    #[test]
    fn highest_streak_never_trails_streak(answers in proptest::collection::vec(any::<bool>(), 1..30)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let count = u64::try_from(answers.len()).unwrap();
        let repo = InMemoryRepository::with_questions((1..=count).map(mc));
        let loop_svc = SessionLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        )
        .with_seed(9);
        let settings = SessionSettings::new(
            SessionMode::Practice,
            u32::try_from(answers.len()).unwrap(),
            [QuestionType::MultipleChoice].into_iter().collect(),
            false,
            1500,
        )
        .unwrap();

        runtime.block_on(async {
            let mut engine = loop_svc.new_engine(settings);
            loop_svc.start_session(&mut engine).await.unwrap();
            let mut correct = 0;
            for is_right in &answers {
                let feedback = loop_svc
                    .submit_answer(&mut engine, if *is_right { "a" } else { "b" })
                    .unwrap();
                prop_assert_eq!(feedback.is_correct, *is_right);
                prop_assert!(engine.highest_streak() >= engine.streak());
                correct += u32::from(*is_right);
                loop_svc.advance(&mut engine).await.unwrap();
            }
            prop_assert!(engine.is_complete());
            prop_assert_eq!(engine.score().correct, correct);
            prop_assert!(engine.highest_streak() <= correct);
            Ok(())
        })?;
    }
}
