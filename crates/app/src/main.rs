use std::fmt;
use std::sync::Arc;

use services::{
    AchievementService, Clock, Feedback, LoopStep, SessionCompletion, SessionEngine,
    SessionLoopService, SettingsService,
};
use storage::repository::{QuestionRepository, Storage};
use storage::seed::builtin_questions;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use vocab_core::model::{Question, QuestionKind, SessionMode, SessionSettingsDraft};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Args {
    db_url: String,
    count: Option<u32>,
    quiz: bool,
    auto_advance: Option<bool>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run  [--db <sqlite_url>] [--count <n>] [--quiz] [--no-auto-advance]");
    eprintln!("  cargo run -p app -- seed [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults for run:");
    eprintln!("  --db sqlite:vocab.sqlite3");
    eprintln!("  saved settings for everything else");
    eprintln!();
    eprintln!("While answering: type an option number (comma separated for matching),");
    eprintln!("  s to skip (quiz only), q to quit.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_QUESTION_COUNT, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>, cmd: Command) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("VOCAB_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://vocab.sqlite3".into(), normalize_sqlite_url);
        let mut count = std::env::var("VOCAB_QUESTION_COUNT")
            .ok()
            .and_then(|value| value.parse::<u32>().ok());
        let mut quiz = false;
        let mut auto_advance = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--count" if cmd == Command::Run => {
                    let value = require_value(args, "--count")?;
                    let parsed: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                    count = Some(parsed);
                }
                "--quiz" if cmd == Command::Run => quiz = true,
                "--no-auto-advance" if cmd == Command::Run => auto_advance = Some(false),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            count,
            quiz,
            auto_advance,
        })
    }

    /// Saved settings with this invocation's overrides applied.
    fn apply(&self, mut draft: SessionSettingsDraft) -> SessionSettingsDraft {
        if let Some(count) = self.count {
            draft.question_count = count;
        }
        if self.quiz {
            draft.mode = SessionMode::Quiz;
        }
        if let Some(auto_advance) = self.auto_advance {
            draft.auto_advance = auto_advance;
        }
        draft
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    // stdout belongs to the quiz; logs go to stderr and stay quiet unless asked for
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: start a session when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter, cmd).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Run => {
            let seeded = ensure_questions(storage.questions.as_ref()).await?;
            if seeded > 0 {
                println!("Question bank was empty; added {seeded} starter questions.");
            }
            run_session(&storage, &parsed).await
        }
        Command::Seed => {
            let seeded = seed_questions(storage.questions.as_ref()).await?;
            let total = storage.questions.count_questions().await?;
            println!("seeded {seeded} questions into {} ({total} total)", parsed.db_url);
            Ok(())
        }
    }
}

async fn seed_questions(questions: &dyn QuestionRepository) -> Result<usize, Box<dyn std::error::Error>> {
    let builtin = builtin_questions()?;
    for question in &builtin {
        questions.upsert_question(question).await?;
    }
    Ok(builtin.len())
}

async fn ensure_questions(questions: &dyn QuestionRepository) -> Result<usize, Box<dyn std::error::Error>> {
    if questions.count_questions().await? > 0 {
        return Ok(0);
    }
    let seeded = seed_questions(questions).await?;
    tracing::info!(seeded, "empty question bank seeded");
    Ok(seeded)
}

async fn run_session(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings_service = SettingsService::new(Arc::clone(&storage.snapshots));
    let saved = settings_service.load().await?;
    let settings = args.apply(SessionSettingsDraft::from(&saved)).validate()?;

    let loop_svc = SessionLoopService::from_storage(Clock::system(), storage);
    let mut engine = loop_svc.new_engine(settings);
    let count = loop_svc.start_session(&mut engine).await?;
    println!("Starting a {} session with {count} questions.", engine.mode());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut completion = drive_session(&loop_svc, &mut engine, &mut input).await;
    if engine.is_complete() && !matches!(completion, Ok(Some(_))) {
        // the run finished but its recording failed or was interrupted
        match loop_svc.finalize_summary(&mut engine).await {
            Ok(Some(done)) => completion = Ok(Some(done)),
            Ok(None) => {}
            Err(err) => completion = Err(err.into()),
        }
    }
    let completion = completion?;

    match completion {
        Some(done) => {
            print_completion(&done);
            let achievements = AchievementService::new(
                Arc::clone(&storage.snapshots),
                Arc::clone(&storage.progress),
            );
            let unlocked = achievements.unlocked().await?.len();
            let total = achievements.achievements().await?.len();
            println!("Achievements unlocked: {unlocked}/{total}");
        }
        None => println!("Session abandoned."),
    }
    Ok(())
}

/// Run the question loop until the session completes or the user leaves.
async fn drive_session<R>(
    loop_svc: &SessionLoopService,
    engine: &mut SessionEngine,
    input: &mut tokio::io::Lines<R>,
) -> Result<Option<SessionCompletion>, Box<dyn std::error::Error>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        let Some(question) = engine.current_question().cloned() else {
            return Ok(None);
        };
        print_question(engine, &question);

        let Some(line) = input.next_line().await? else {
            engine.abandon();
            return Ok(None);
        };
        let line = line.trim();
        match line {
            "q" | "quit" => {
                engine.abandon();
                return Ok(None);
            }
            "s" | "skip" => {
                match loop_svc.skip(engine).await? {
                    LoopStep::Ignored => println!("Skipping is only available in quiz mode."),
                    LoopStep::Moved { .. } => println!("Skipped."),
                    LoopStep::Completed(done) => return Ok(Some(*done)),
                }
                continue;
            }
            _ => {}
        }

        let answer = resolve_answer(&question, line);
        let Some(feedback) = loop_svc.submit_answer(engine, &answer) else {
            continue;
        };
        print_feedback(&feedback);

        match next_step(loop_svc, engine, input).await? {
            LoopStep::Completed(done) => return Ok(Some(*done)),
            LoopStep::Moved { .. } | LoopStep::Ignored => {}
        }
    }
}

enum Wake {
    Timer,
    Input(std::io::Result<Option<String>>),
}

/// Wait for Enter, or for the auto-advance timer when one is pending.
async fn next_step<R>(
    loop_svc: &SessionLoopService,
    engine: &mut SessionEngine,
    input: &mut tokio::io::Lines<R>,
) -> Result<LoopStep, Box<dyn std::error::Error>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let Some(deadline) = engine.auto_advance_deadline() else {
        println!("(press Enter to continue)");
        input.next_line().await?;
        return Ok(loop_svc.advance(engine).await?);
    };

    // only the sleep is raced; recording runs to completion outside select
    let wake = tokio::select! {
        () = loop_svc.sleep_until(deadline) => Wake::Timer,
        line = input.next_line() => Wake::Input(line),
    };
    match wake {
        Wake::Timer => Ok(loop_svc.fire_auto_advance(engine).await?),
        Wake::Input(line) => {
            line?;
            Ok(loop_svc.advance(engine).await?)
        }
    }
}

/// Map typed option numbers to option ids; anything else passes through.
fn resolve_answer(question: &Question, line: &str) -> String {
    let options = question.options();
    let resolve = |token: &str| -> String {
        token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| options.get(index))
            .map_or_else(|| token.to_owned(), |option| option.id.clone())
    };
    match question.kind() {
        QuestionKind::Matching { .. } => line
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(resolve)
            .collect::<Vec<_>>()
            .join(","),
        _ => resolve(line),
    }
}

fn print_question(engine: &SessionEngine, question: &Question) {
    let progress = engine.progress();
    println!();
    println!(
        "[{}/{}] {} (streak {})",
        engine.cursor() + 1,
        progress.total,
        question.question_type(),
        progress.streak
    );
    println!("{}", question.prompt());
    for (index, option) in question.options().iter().enumerate() {
        println!("  {}. {}", index + 1, option.text);
    }
    if matches!(question.kind(), QuestionKind::Matching { .. }) {
        println!("Pick every correct pair, e.g. 1,3,4");
    }
}

fn print_feedback(feedback: &Feedback) {
    println!("{}", feedback.message);
    if let Some(answer) = &feedback.correct_answer {
        println!("Correct answer: {answer}");
    }
    if let Some(explanation) = &feedback.explanation {
        println!("{explanation}");
    }
    if let Some(streak) = feedback.streak_message {
        println!("{streak}");
    }
}

fn print_completion(done: &SessionCompletion) {
    let summary = &done.summary;
    println!();
    println!(
        "Session complete: {}/{} correct ({}%), best streak {}, {}s.",
        summary.correct(),
        summary.total(),
        summary.percentage(),
        summary.highest_streak(),
        summary.elapsed_secs()
    );
    println!(
        "All time: {} sessions, {}% accuracy. Day streak: {}.",
        done.all_time.sessions,
        done.all_time.accuracy(),
        done.counters.streak_days
    );
    for achievement in &done.newly_unlocked {
        println!("Achievement unlocked: {} ({:?})", achievement.title(), achievement.level());
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::QuestionId;

    fn find(id: u64) -> Question {
        builtin_questions()
            .unwrap()
            .into_iter()
            .find(|q| q.id() == QuestionId::new(id))
            .unwrap()
    }

    #[test]
    fn numbers_map_to_option_ids() {
        let question = find(1);
        assert_eq!(resolve_answer(&question, "2"), "b");
        assert!(question.is_correct(&resolve_answer(&question, "2")));
        assert_eq!(resolve_answer(&question, "9"), "9");
        assert_eq!(resolve_answer(&question, "c"), "c");
    }

    #[test]
    fn matching_accepts_number_lists_in_any_order() {
        let question = find(12);
        let answer = resolve_answer(&question, "3, 1 ,2");
        assert!(question.is_correct(&answer));
    }

    #[test]
    fn overrides_apply_on_top_of_saved_settings() {
        let args = Args {
            db_url: "sqlite::memory:".into(),
            count: Some(5),
            quiz: true,
            auto_advance: Some(false),
        };
        let settings = args
            .apply(SessionSettingsDraft::default())
            .validate();
        assert!(settings.is_err());

        let saved = vocab_core::model::SessionSettings::default();
        let settings = args
            .apply(SessionSettingsDraft::from(&saved))
            .validate()
            .unwrap();
        assert_eq!(settings.question_count(), 5);
        assert_eq!(settings.mode(), SessionMode::Quiz);
        assert!(!settings.auto_advance());
    }
}
