use std::fmt;

use storage::repository::{QuestionRepository, Storage};
use storage::seed::builtin_questions;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn parse_db_url() -> Result<String, ArgsError> {
    let mut db_url =
        std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite://vocab.sqlite3?mode=rwc".into());

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = args.next().ok_or(ArgsError::MissingValue { flag: "--db" })?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                db_url = value;
            }
            "--help" | "-h" => {
                eprintln!("Usage: seed [--db <sqlite_url>]");
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(db_url)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_url = parse_db_url()?;
    let storage = Storage::sqlite(&db_url).await?;

    let questions = builtin_questions()?;
    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }

    let total = storage.questions.count_questions().await?;
    println!("seeded {} questions into {db_url} ({total} total)", questions.len());
    Ok(())
}
