use std::fmt;
use std::sync::Arc;

use prep_core::model::{Difficulty, LearnerId, ProgressSummary, Question, Skill};
use services::practice::DEFAULT_SESSION_LENGTH;
use services::{
    AnswerOutcome, AppServices, Clock, ExamSession, LocalJsonBank, OpenSatBank, PracticeConfig,
    PracticeError, PracticeSession, QuestionBank, Subject,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  satprep practice [--db <sqlite_url>] [--learner <id>] [--bank <path|opensat>]");
    eprintln!("                   [--subject math|english] [--skill <label>]... [--difficulty <e|m|h>]...");
    eprintln!("                   [--assessment <tag>] [--count <n>] [--seed <n>]");
    eprintln!("  satprep exam     [--db <sqlite_url>] [--learner <id>] [--bank <path|opensat>]");
    eprintln!("                   [--subject math|english] [--skill <label>]... [--difficulty <e|m|h>]...");
    eprintln!("                   [--assessment <tag>] [--count <n>]");
    eprintln!("  satprep stats    [--db <sqlite_url>] [--learner <id>]");
    eprintln!("  satprep reset    [--db <sqlite_url>] [--learner <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://satprep.sqlite3");
    eprintln!("  --learner guest");
    eprintln!("  --bank opensat");
    eprintln!("  --count {DEFAULT_SESSION_LENGTH}  (0 for an open-ended session; exams default to the whole bank)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_LEARNER, PREP_BANK, PREP_OPENSAT_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Exam,
    Stats,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "exam" => Some(Self::Exam),
            "stats" => Some(Self::Stats),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    fn reads_bank(self) -> bool {
        matches!(self, Self::Practice | Self::Exam)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BankSource {
    OpenSat,
    File(String),
}

impl BankSource {
    fn from_arg(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("opensat") {
            Self::OpenSat
        } else {
            Self::File(raw.trim().to_owned())
        }
    }

    fn build(&self) -> Arc<dyn QuestionBank> {
        match self {
            BankSource::OpenSat => Arc::new(OpenSatBank::from_env()),
            BankSource::File(path) => Arc::new(LocalJsonBank::new(path)),
        }
    }
}

struct Args {
    db_url: String,
    learner: LearnerId,
    bank: BankSource,
    practice: PracticeConfig,
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PREP_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://satprep.sqlite3".into(), normalize_sqlite_url);
        let mut learner = std::env::var("PREP_LEARNER")
            .ok()
            .and_then(|value| LearnerId::new(value).ok())
            .map_or_else(default_learner, Ok)?;
        let mut bank = std::env::var("PREP_BANK")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or(BankSource::OpenSat, |value| BankSource::from_arg(&value));
        let mut practice = PracticeConfig::default();
        if cmd == Command::Exam {
            practice.limit = None;
        }

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--learner" => {
                    let value = require_value(args, "--learner")?;
                    learner = LearnerId::new(value.clone()).map_err(|_| {
                        ArgsError::InvalidValue {
                            flag: "--learner",
                            raw: value,
                        }
                    })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd.reads_bank() => {
                    parse_practice_flag(&arg, args, &mut bank, &mut practice)?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            learner,
            bank,
            practice,
        })
    }
}

fn default_learner() -> Result<LearnerId, ArgsError> {
    LearnerId::new("guest").map_err(|_| ArgsError::InvalidValue {
        flag: "--learner",
        raw: "guest".into(),
    })
}

fn parse_practice_flag(
    arg: &str,
    args: &mut impl Iterator<Item = String>,
    bank: &mut BankSource,
    practice: &mut PracticeConfig,
) -> Result<(), ArgsError> {
    match arg {
        "--bank" => {
            *bank = BankSource::from_arg(&require_value(args, "--bank")?);
        }
        "--subject" => {
            let value = require_value(args, "--subject")?;
            let subject = value.parse::<Subject>().map_err(|_| ArgsError::InvalidValue {
                flag: "--subject",
                raw: value.clone(),
            })?;
            practice.filter.subject = Some(subject);
        }
        "--skill" => {
            practice
                .filter
                .skills
                .insert(Skill::new(require_value(args, "--skill")?));
        }
        "--difficulty" => {
            let value = require_value(args, "--difficulty")?;
            let difficulty = value
                .parse::<Difficulty>()
                .map_err(|_| ArgsError::InvalidValue {
                    flag: "--difficulty",
                    raw: value.clone(),
                })?;
            practice.filter.difficulties.insert(difficulty);
        }
        "--assessment" => {
            practice.filter.assessment = Some(require_value(args, "--assessment")?);
        }
        "--count" => {
            let value = require_value(args, "--count")?;
            let count: u32 = value.parse().map_err(|_| ArgsError::InvalidValue {
                flag: "--count",
                raw: value.clone(),
            })?;
            practice.limit = (count > 0).then_some(count);
        }
        "--seed" => {
            let value = require_value(args, "--seed")?;
            let seed: u64 = value.parse().map_err(|_| ArgsError::InvalidValue {
                flag: "--seed",
                raw: value.clone(),
            })?;
            practice.seed = Some(seed);
        }
        _ => return Err(ArgsError::UnknownArg(arg.to_owned())),
    }
    Ok(())
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

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

fn choice_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .map_or('?', char::from)
}

/// Accepts a letter ("b") or a one-based number ("2").
fn parse_choice(input: &str, len: usize) -> Option<usize> {
    let input = input.trim();
    if let Ok(number) = input.parse::<usize>() {
        return number.checked_sub(1).filter(|&index| index < len);
    }
    match input.as_bytes() {
        [letter] if letter.is_ascii_alphabetic() => {
            let index = usize::from(letter.to_ascii_uppercase() - b'A');
            (index < len).then_some(index)
        }
        _ => None,
    }
}

fn print_question(number: u32, question: &Question) {
    println!();
    println!(
        "Question {number}  [{} · {}]",
        question.skill(),
        question.difficulty()
    );
    if !question.prompt().is_empty() {
        println!("{}", question.prompt());
    }
    for (index, choice) in question.choices().iter().enumerate() {
        println!("  {}) {choice}", choice_label(index));
    }
}

fn print_outcome(question: &Question, outcome: &AnswerOutcome) {
    if outcome.is_correct {
        println!("Correct! +{} points", outcome.points_awarded);
    } else {
        let answer = question
            .choices()
            .get(outcome.correct_index)
            .map_or("", String::as_str);
        println!(
            "Not quite. The answer was {}) {answer}",
            choice_label(outcome.correct_index)
        );
    }
    if let Some(explanation) = question.explanation() {
        println!("{explanation}");
    }
    for badge in &outcome.new_badges {
        println!("Badge earned: {badge}");
    }
    println!(
        "Points {} · streak {}",
        outcome.record.points(),
        outcome.record.streak()
    );
}

fn print_summary(learner: &LearnerId, summary: &ProgressSummary) {
    println!("Progress for {learner}");
    println!("  points:   {}", summary.points);
    println!("  streak:   {}", summary.streak);
    println!(
        "  answered: {} ({} correct, {}%)",
        summary.total_attempts, summary.total_correct, summary.overall_accuracy_percent
    );
    if !summary.badges.is_empty() {
        let badges: Vec<String> = summary.badges.iter().map(ToString::to_string).collect();
        println!("  badges:   {}", badges.join(", "));
    }
    if summary.skills.is_empty() {
        return;
    }
    println!("  skills (weakest first):");
    for row in &summary.skills {
        println!(
            "    {:<40} {:>3}/{:<3} {:>3}%  {}",
            row.skill.as_str(),
            row.correct,
            row.attempts,
            row.accuracy_percent,
            row.band().label()
        );
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn read_answer(
    lines: &mut Lines<BufReader<Stdin>>,
    len: usize,
) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
            return Ok(None);
        }
        match parse_choice(line, len) {
            Some(choice) => return Ok(Some(choice)),
            None => println!("Enter a letter between A and {}, or q to quit.", choice_label(len - 1)),
        }
    }
}

async fn run_practice(
    session: &mut PracticeSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut number = 0;

    loop {
        let question = match session.next_question().await {
            Ok(question) => question.clone(),
            Err(PracticeError::Completed) => break,
            Err(err) => return Err(err.into()),
        };
        number += 1;
        print_question(number, &question);

        let Some(choice) = read_answer(&mut lines, question.choices().len()).await? else {
            break;
        };
        let outcome = session.answer(choice).await?;
        print_outcome(&question, &outcome);
    }

    let tally = session.tally();
    println!();
    match tally.accuracy_percent() {
        Some(percent) => println!(
            "Session: {}/{} correct ({percent}%), +{} points",
            tally.correct, tally.answered, tally.points
        ),
        None => println!("Session ended before any answers."),
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExamInput {
    Answer(usize),
    Next,
    Prev,
    Quit,
}

/// Navigation words win over choice letters.
fn parse_exam_input(input: &str, len: usize) -> Option<ExamInput> {
    let input = input.trim();
    match input.to_ascii_lowercase().as_str() {
        "n" | "next" | "" => Some(ExamInput::Next),
        "p" | "prev" => Some(ExamInput::Prev),
        "q" | "quit" => Some(ExamInput::Quit),
        _ => parse_choice(input, len).map(ExamInput::Answer),
    }
}

fn print_exam_question(exam: &ExamSession) {
    let question = exam.current();
    println!();
    println!(
        "Answered {} / {}    question {} of {}",
        exam.answered_count(),
        exam.len(),
        exam.position() + 1,
        exam.len()
    );
    println!("[{} · {}]", question.skill(), question.difficulty());
    if !question.prompt().is_empty() {
        println!("{}", question.prompt());
    }
    let answer = exam.current_answer();
    for (index, choice) in question.choices().iter().enumerate() {
        let mark = match answer {
            Some(_) if index == question.correct_index() => "  ✓",
            Some(given) if given.choice == index => "  ✕",
            _ => "",
        };
        println!("  {}) {choice}{mark}", choice_label(index));
    }
}

async fn run_exam(exam: &mut ExamSession) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Exam mode: answer with a letter, n/p to move, q to finish.");
    print_exam_question(exam);

    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let len = exam.current().choices().len();
        match parse_exam_input(&line, len) {
            Some(ExamInput::Quit) => break,
            Some(ExamInput::Next) => {
                if !exam.move_next() {
                    println!("This is the last question.");
                    continue;
                }
            }
            Some(ExamInput::Prev) => {
                if !exam.move_prev() {
                    println!("This is the first question.");
                    continue;
                }
            }
            Some(ExamInput::Answer(choice)) => {
                let question = exam.current().clone();
                match exam.answer(choice).await {
                    Ok(outcome) => print_outcome(&question, &outcome),
                    Err(PracticeError::AlreadyAnswered) => {
                        println!("Already answered. Use n or p to move on.");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
                if exam.is_finished() {
                    println!();
                    println!("All {} questions answered.", exam.len());
                    break;
                }
                continue;
            }
            None => {
                println!("Enter a letter between A and {}, n, p or q.", choice_label(len - 1));
                continue;
            }
        }
        print_exam_question(exam);
    }

    let tally = exam.tally();
    println!();
    match tally.accuracy_percent() {
        Some(percent) => println!(
            "Exam: {}/{} correct ({percent}%), +{} points",
            tally.correct, tally.answered, tally.points
        ),
        None => println!("Exam ended before any answers."),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: practice when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Practice,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Practice,
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
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let services =
        AppServices::new_sqlite(&parsed.db_url, Clock::default(), parsed.bank.build()).await?;

    match cmd {
        Command::Practice => {
            let mut session = services
                .practice_loop()
                .start_session(parsed.learner.clone(), &parsed.practice)
                .await?;
            run_practice(&mut session).await?;
            let summary = services.summary(&parsed.learner).await?;
            print_summary(&parsed.learner, &summary);
        }
        Command::Exam => {
            let mut exam = services
                .practice_loop()
                .start_exam(parsed.learner.clone(), &parsed.practice)
                .await?;
            run_exam(&mut exam).await?;
            let summary = services.summary(&parsed.learner).await?;
            print_summary(&parsed.learner, &summary);
        }
        Command::Stats => {
            let summary = services.summary(&parsed.learner).await?;
            print_summary(&parsed.learner, &summary);
        }
        Command::Reset => {
            services.progress_store().reset(&parsed.learner).await?;
            println!("Progress for {} has been reset.", parsed.learner);
        }
    }
    Ok(())
}

/// `RUST_LOG`-style directives; anything unspecified logs at `warn`.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

#[tokio::main]
async fn main() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
