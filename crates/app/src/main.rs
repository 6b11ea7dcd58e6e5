use std::fmt;

use chrono::Duration;
use quiz_core::model::{Difficulty, QuestionDraft, QuestionFilter, UserId};
use services::{AppServices, Clock, StartRequest};
use storage::seed::default_catalog;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod play;
mod render;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_QUESTION_COUNT: usize = 7;
const DEFAULT_MINUTES: i64 = 5;
const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDifficulty { raw: String },
    MissingField { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw} (Easy, Medium or Hard)")
            }
            ArgsError::MissingField { flag } => write!(f, "{flag} is required"),
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

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

/// Minutes to a time budget; `0` disables the timer.
fn parse_time_budget(raw: String) -> Result<Option<Duration>, ArgsError> {
    let minutes: i64 = parse_number(raw.clone(), "--minutes")?;
    if minutes == 0 {
        return Ok(None);
    }
    if minutes < 0 {
        return Err(ArgsError::InvalidNumber {
            flag: "--minutes",
            raw,
        });
    }
    Duration::try_minutes(minutes)
        .map(Some)
        .ok_or(ArgsError::InvalidNumber {
            flag: "--minutes",
            raw,
        })
}

fn parse_difficulty(raw: String) -> Result<Difficulty, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidDifficulty { raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--db <sqlite_url>] [--user <id>] [--subject <s>]");
    eprintln!("                           [--category <c>] [--difficulty <d>] [--count <n>]");
    eprintln!("                           [--minutes <m>]");
    eprintln!("  cargo run -p app -- leaderboard [--db <sqlite_url>] [--user <id>] [--limit <n>]");
    eprintln!("  cargo run -p app -- add  [--db <sqlite_url>] --subject <s> --category <c>");
    eprintln!("                           --difficulty <d> --prompt <text> --choice <text>...");
    eprintln!("                           --answer <text>");
    eprintln!("  cargo run -p app -- seed [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --count {DEFAULT_QUESTION_COUNT}");
    eprintln!("  --minutes {DEFAULT_MINUTES}  (0 disables the timer)");
    eprintln!("  --limit {DEFAULT_LIMIT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Leaderboard,
    Add,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "leaderboard" => Some(Self::Leaderboard),
            "add" => Some(Self::Add),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Flags shared by every command plus the per-command ones.
///
/// Commands ignore the fields they do not use.
#[derive(Debug)]
struct Args {
    db_url: String,
    user: Option<UserId>,
    subject: Option<String>,
    category: Option<String>,
    difficulty: Option<Difficulty>,
    count: usize,
    /// `None` runs the quiz without a timer.
    time_budget: Option<Duration>,
    limit: u32,
    prompt: Option<String>,
    choices: Vec<String>,
    answer: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("QUIZ_DB_URL")
                .ok()
                .map_or_else(|| normalize_sqlite_url(DEFAULT_DB_URL.into()), normalize_sqlite_url),
            user: std::env::var("QUIZ_USER").ok().and_then(UserId::new),
            subject: None,
            category: None,
            difficulty: None,
            count: DEFAULT_QUESTION_COUNT,
            time_budget: Duration::try_minutes(DEFAULT_MINUTES),
            limit: DEFAULT_LIMIT,
            prompt: None,
            choices: Vec::new(),
            answer: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--user" => parsed.user = UserId::new(require_value(args, "--user")?),
                "--subject" => parsed.subject = Some(require_value(args, "--subject")?),
                "--category" => parsed.category = Some(require_value(args, "--category")?),
                "--difficulty" => {
                    parsed.difficulty =
                        Some(parse_difficulty(require_value(args, "--difficulty")?)?);
                }
                "--count" => parsed.count = parse_number(require_value(args, "--count")?, "--count")?,
                "--minutes" => {
                    parsed.time_budget = parse_time_budget(require_value(args, "--minutes")?)?;
                }
                "--limit" => parsed.limit = parse_number(require_value(args, "--limit")?, "--limit")?,
                "--prompt" => parsed.prompt = Some(require_value(args, "--prompt")?),
                "--choice" => parsed.choices.push(require_value(args, "--choice")?),
                "--answer" => parsed.answer = Some(require_value(args, "--answer")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn filter(&self) -> QuestionFilter {
        let mut filter = QuestionFilter::any();
        if let Some(subject) = &self.subject {
            filter = filter.with_subject(subject.as_str());
        }
        if let Some(category) = &self.category {
            filter = filter.with_category(category.as_str());
        }
        if let Some(difficulty) = self.difficulty {
            filter = filter.with_difficulty(difficulty);
        }
        filter
    }

    fn start_request(&self) -> StartRequest {
        let request = StartRequest::new(self.filter(), self.count).with_user(self.user.clone());
        match self.time_budget {
            Some(budget) => request.with_time_budget(budget),
            None => request,
        }
    }

    fn question_draft(&self) -> Result<QuestionDraft, ArgsError> {
        let subject = self
            .subject
            .clone()
            .ok_or(ArgsError::MissingField { flag: "--subject" })?;
        let category = self
            .category
            .clone()
            .ok_or(ArgsError::MissingField { flag: "--category" })?;
        let difficulty = self
            .difficulty
            .ok_or(ArgsError::MissingField { flag: "--difficulty" })?;
        let prompt = self
            .prompt
            .clone()
            .ok_or(ArgsError::MissingField { flag: "--prompt" })?;
        let answer = self
            .answer
            .clone()
            .ok_or(ArgsError::MissingField { flag: "--answer" })?;
        Ok(QuestionDraft::new(
            subject,
            category,
            difficulty,
            prompt,
            self.choices.clone(),
            answer,
        ))
    }
}

/// Turn bare paths into `sqlite://<absolute path>?mode=rwc` so the file is created on first run.
fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim().to_string();
    if trimmed == "sqlite::memory:" || trimmed.contains('?') {
        return trimmed;
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed.as_str());
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}?mode=rwc", absolute.display())
}

fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(rest) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    // Logs go to stderr so they never interleave with the quiz on stdout.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: start a quiz when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
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
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_dir(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default()).await?;

    match cmd {
        Command::Play => {
            let request = parsed.start_request();
            play::run(&services, request).await?;
        }
        Command::Leaderboard => match &parsed.user {
            Some(user) => {
                let history = services.leaderboard().history(user, parsed.limit).await?;
                render::history(user, &history);
            }
            None => {
                let top = services.leaderboard().top(parsed.limit).await?;
                render::leaderboard(&top);
            }
        },
        Command::Add => {
            let draft = parsed.question_draft()?;
            let question = services.catalog().add(draft).await?;
            println!("Added question {}.", question.id());
        }
        Command::Seed => {
            let inserted = services.catalog().seed_if_empty(default_catalog()).await?;
            let total = services.catalog().count().await?;
            println!("Seeded {inserted} questions ({total} in catalog).");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
