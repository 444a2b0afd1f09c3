use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{QuestionDraft, ThemeDraft, UserId};
use storage::repository::{NewQuestionRecord, NewThemeRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    owner: UserId,
    private: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidOwner { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidOwner { raw } => {
                write!(f, "invalid --owner value (expected UUID): {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PERUQUIZ_DB_URL").unwrap_or_else(|_| "sqlite:peruquiz.sqlite3".into());
        let mut owner = std::env::var("PERUQUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(UserId::generate);
        let mut private = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--owner" => {
                    let value = require_value(&mut args, "--owner")?;
                    owner = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidOwner { raw: value.clone() })?;
                }
                "--private" => private = true,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
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
            owner,
            private,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:peruquiz.sqlite3)");
    eprintln!("  --owner <uuid>            Creator of the seeded theme (default: random)");
    eprintln!("  --private                 Seed the theme as private to the owner");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PERUQUIZ_DB_URL, PERUQUIZ_USER_ID");
}

const SAMPLES: [(&str, [&str; 4], usize); 5] = [
    (
        "¿Cuál es la capital del Perú?",
        ["Cusco", "Lima", "Arequipa", "Trujillo"],
        1,
    ),
    (
        "¿En qué año se proclamó la independencia del Perú?",
        ["1810", "1821", "1824", "1879"],
        1,
    ),
    (
        "¿Qué ciudadela inca fue redescubierta en 1911?",
        ["Machu Picchu", "Sacsayhuamán", "Chan Chan", "Kuélap"],
        0,
    ),
    (
        "¿Cuál es el lago navegable más alto del mundo?",
        ["Lago Junín", "Lago Titicaca", "Laguna Parón", "Lago Arapa"],
        1,
    ),
    (
        "¿Qué cultura creó las líneas de Nazca?",
        ["Mochica", "Chavín", "Nazca", "Paracas"],
        2,
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let fields = ThemeDraft {
        title: "Historia del Perú".into(),
        description: "Preguntas sobre la historia y geografía del Perú".into(),
        icon: "landmark".into(),
        colors: vec!["#D91023".into(), "#FFFFFF".into()],
        is_public: !args.private,
    }
    .validate()?;
    let theme = storage
        .themes
        .insert_theme(NewThemeRecord {
            fields,
            created_by: args.owner,
            created_at: now,
        })
        .await?;

    let mut records = Vec::with_capacity(SAMPLES.len());
    for (offset, (text, answers, correct)) in (0_i64..).zip(SAMPLES) {
        records.push(NewQuestionRecord {
            fields: QuestionDraft::with_answers(theme.id(), text, answers, correct).validate()?,
            created_by: args.owner,
            created_at: now + Duration::seconds(offset),
        });
    }
    let stored = storage.questions.insert_questions(records).await?;
    let delta = i32::try_from(stored.len())?;
    let count = storage
        .themes
        .adjust_question_count(theme.id(), delta)
        .await?;

    println!(
        "Seeded theme {} \"{}\" with {} questions for {} into {}",
        theme.id(),
        theme.title(),
        count,
        args.owner,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
