use std::fmt;
use std::io::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use revise_core::model::{ScoreBand, SessionScore};
use services::config::parse_session_size;
use services::{
    ConfigError, RevisionConfig, RevisionEngine, SessionError, corpus_source_for, load_corpus,
};
use storage::{ProgressStore, Storage};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    MissingCorpus,
    Config(ConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingCorpus => {
                write!(f, "no corpus given (use --corpus or REVISE_CORPUS)")
            }
            ArgsError::Config(err) => write!(f, "{err}"),
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
    corpus: Option<String>,
    config: RevisionConfig,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- revise [--corpus <path|url>] [--db <sqlite_url>]");
    eprintln!("                             [--policy priority|rotation] [--session-size <n>]");
    eprintln!("  cargo run -p app -- stats  [--corpus <path|url>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- reset  [--corpus <path|url>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://revise.sqlite3");
    eprintln!("  --policy priority");
    eprintln!("  --session-size 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  REVISE_CORPUS, REVISE_DB_URL, REVISE_POLICY, REVISE_SESSION_SIZE,");
    eprintln!("  REVISE_COOLDOWN_MS, REVISE_LOG (falls back to RUST_LOG)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Revise,
    Stats,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "revise" => Some(Self::Revise),
            "stats" => Some(Self::Stats),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("REVISE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://revise.sqlite3".into(), normalize_sqlite_url);
        let mut corpus = std::env::var("REVISE_CORPUS")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut config = RevisionConfig::from_env().map_err(ArgsError::Config)?;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--corpus" => {
                    corpus = Some(require_value(args, "--corpus")?);
                }
                "--policy" => {
                    let value = require_value(args, "--policy")?;
                    config = config.with_policy(value.parse().map_err(ArgsError::Config)?);
                }
                "--session-size" => {
                    let value = require_value(args, "--session-size")?;
                    let size = parse_session_size(&value).map_err(ArgsError::Config)?;
                    config = config.with_session_size(size).map_err(ArgsError::Config)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            corpus,
            config,
        })
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
    let filter = EnvFilter::try_from_env("REVISE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means an interactive revision.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Revise,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Revise,
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

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let store = ProgressStore::new(Arc::clone(&storage.kv));

    match cmd {
        Command::Revise => {
            let mut engine = open_engine(parsed.corpus.as_deref(), store, parsed.config).await?;
            revise(&mut engine).await
        }
        Command::Stats => {
            let engine = open_engine(parsed.corpus.as_deref(), store, parsed.config).await?;
            print_stats(&engine);
            Ok(())
        }
        Command::Reset => {
            // Without a corpus there is no term count to keep, so just drop both entries.
            if parsed.corpus.is_some() {
                let mut engine =
                    open_engine(parsed.corpus.as_deref(), store, parsed.config).await?;
                engine.reset_progress().await?;
            } else {
                store.clear().await?;
            }
            println!("Progress cleared.");
            Ok(())
        }
    }
}

async fn open_engine(
    location: Option<&str>,
    store: ProgressStore,
    config: RevisionConfig,
) -> Result<RevisionEngine, Box<dyn std::error::Error>> {
    let location = location.ok_or(ArgsError::MissingCorpus)?;
    let source = corpus_source_for(location);
    let corpus = load_corpus(source.as_ref()).await?;
    Ok(RevisionEngine::open(corpus, store, config).await?)
}

async fn revise(engine: &mut RevisionEngine) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    print_stats(engine);

    loop {
        let started = engine.start_revision().await?;
        if started.cycle_reset.is_some() {
            println!("Every term has been covered: starting a new cycle.");
        }
        println!(
            "\nNew session: {} terms ({} to learn, {} to consolidate)\n",
            started.total, started.priority_selected, started.padding_selected
        );

        if !run_session(engine, &mut input).await? {
            engine.start_new_session();
            return Ok(());
        }

        if let Some(ready_at) = engine.ready_at() {
            wait_until(ready_at).await;
        }
        if let Some(score) = engine.score() {
            print_score(&score);
        }
        if confirm(&mut input, "Review your answers? [y/N] ").await? {
            print_review(engine);
        }

        engine.start_new_session();
        print_stats(engine);
        if !confirm(&mut input, "Start a new session? [y/N] ").await? {
            return Ok(());
        }
    }
}

/// Drive one session to completion. Returns `false` if input ended first.
async fn run_session(
    engine: &mut RevisionEngine,
    input: &mut Input,
) -> Result<bool, Box<dyn std::error::Error>> {
    while let Some(term) = engine.current_term().cloned() {
        if let Some(ready_at) = engine.ready_at() {
            wait_until(ready_at).await;
        }
        if let Some(progress) = engine.session_progress() {
            println!(
                "[{}/{}] {}  (UE {} - {})",
                progress.position,
                progress.total,
                term.name(),
                term.ue(),
                term.course_title()
            );
        }

        loop {
            let Some(line) = prompt(input, "Your answer> ").await? else {
                return Ok(false);
            };
            match engine.submit_answer(&line) {
                Ok(_) => break,
                Err(SessionError::BlankAnswer) => {
                    println!("Type an answer before revealing the definition.");
                }
                Err(SessionError::CoolingDown { ready_at }) => wait_until(ready_at).await,
                Err(err) => return Err(err.into()),
            }
        }

        println!("Definition: {}\n", term.definition());

        loop {
            let Some(line) =
                prompt(input, "How did it go? [c]orrect / [p]artial / [w]rong> ").await?
            else {
                return Ok(false);
            };
            match engine.evaluate_class(&expand_class_shortcut(&line)).await {
                Ok(_) => break,
                Err(SessionError::InvalidEvaluation(err)) => println!("{err}"),
                Err(err) => return Err(err.into()),
            }
        }
        println!();
    }
    Ok(true)
}

fn expand_class_shortcut(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "c" => "correct".to_string(),
        "p" => "partial".to_string(),
        "w" => "wrong".to_string(),
        other => other.to_string(),
    }
}

async fn prompt(input: &mut Input, label: &str) -> std::io::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    input.next_line().await
}

async fn confirm(input: &mut Input, label: &str) -> std::io::Result<bool> {
    Ok(prompt(input, label)
        .await?
        .is_some_and(|line| matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")))
}

async fn wait_until(ready_at: DateTime<Utc>) {
    if let Ok(delay) = (ready_at - Utc::now()).to_std() {
        tokio::time::sleep(delay).await;
    }
}

fn print_stats(engine: &RevisionEngine) {
    let stats = engine.stats();
    println!(
        "Terms: {} | mastered: {} ({}%) | to learn: {} | seen: {}",
        stats.total_terms,
        stats.mastered_terms,
        stats.mastery_rate,
        stats.priority_terms,
        stats.seen_terms
    );
    println!(
        "Answers: {} correct, {} partial, {} wrong (policy: {})",
        stats.evaluations.correct,
        stats.evaluations.partial,
        stats.evaluations.wrong,
        engine.policy_kind()
    );
}

fn print_score(score: &SessionScore) {
    let verdict = match score.band() {
        ScoreBand::Strong => "Excellent work!",
        ScoreBand::Fair => "Good, keep going.",
        ScoreBand::Weak => "These terms need more revision.",
    };
    println!(
        "Score: {}% ({} correct, {} partial, {} wrong out of {}). {verdict}",
        score.percentage(),
        score.correct(),
        score.partial(),
        score.wrong(),
        score.total()
    );
}

fn print_review(engine: &RevisionEngine) {
    let Some(results) = engine.review() else {
        return;
    };
    for (position, result) in results.iter().enumerate() {
        println!("{}. {} [{}]", position + 1, result.term.name(), result.evaluation);
        println!("   your answer: {}", result.answer);
        println!("   definition:  {}", result.term.definition());
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
        tracing::error!(error = %err, "revise failed");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
