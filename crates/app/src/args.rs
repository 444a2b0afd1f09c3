use std::fmt;

use quiz_core::model::{QuizSettings, ThemeId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Themes,
    Play,
    History,
    Help,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "themes" => Some(Self::Themes),
            "play" => Some(Self::Play),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidSeconds { raw: String },
    InvalidTheme { raw: String },
    MissingTheme,
    MissingUser,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => {
                write!(f, "invalid --user value (expected UUID): {raw}")
            }
            ArgsError::InvalidSeconds { raw } => {
                write!(f, "invalid --seconds value (expected 1..=600): {raw}")
            }
            ArgsError::InvalidTheme { raw } => write!(f, "invalid --theme value: {raw}"),
            ArgsError::MissingTheme => write!(f, "play requires --theme <id>"),
            ArgsError::MissingUser => write!(f, "history requires --user <uuid>"),
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

fn question_time(raw: &str) -> Option<QuizSettings> {
    let secs = raw.trim().parse::<u32>().ok()?;
    QuizSettings::default().with_question_time(secs).ok()
}

#[derive(Debug, Clone)]
pub struct Args {
    pub command: Command,
    pub db_url: String,
    pub user: Option<UserId>,
    pub settings: QuizSettings,
    pub theme: Option<ThemeId>,
}

impl Args {
    pub fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Flags override the `PERUQUIZ_*` environment.
    pub fn parse_from(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("PERUQUIZ_DB_URL")
            .map_or_else(|| normalize_sqlite_url("peruquiz.sqlite3".into()), normalize_sqlite_url);
        let mut user = env("PERUQUIZ_USER_ID").and_then(|value| value.parse::<UserId>().ok());
        let mut settings = env("PERUQUIZ_QUESTION_SECS")
            .and_then(|value| question_time(&value))
            .unwrap_or_default();
        let mut theme: Option<ThemeId> = None;
        let mut command: Option<Command> = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = Some(
                        value
                            .parse::<UserId>()
                            .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?,
                    );
                }
                "--seconds" => {
                    let value = require_value(&mut args, "--seconds")?;
                    settings = question_time(&value)
                        .ok_or_else(|| ArgsError::InvalidSeconds { raw: value.clone() })?;
                }
                "--theme" => {
                    let value = require_value(&mut args, "--theme")?;
                    theme = Some(
                        value
                            .parse::<ThemeId>()
                            .map_err(|_| ArgsError::InvalidTheme { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => command = Some(Command::Help),
                other if other.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
                other if command.is_none() => {
                    command = Some(
                        Command::from_arg(other)
                            .ok_or_else(|| ArgsError::UnknownCommand(other.to_string()))?,
                    );
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = command.unwrap_or(if theme.is_some() {
            Command::Play
        } else {
            Command::Themes
        });
        match command {
            Command::Play if theme.is_none() => return Err(ArgsError::MissingTheme),
            Command::History if user.is_none() => return Err(ArgsError::MissingUser),
            _ => {}
        }

        Ok(Self {
            command,
            db_url,
            user,
            settings,
            theme,
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  peruquiz themes  [--db <sqlite_url>] [--user <uuid>]");
    eprintln!(
        "  peruquiz play    --theme <id> [--db <sqlite_url>] [--user <uuid>] [--seconds <n>]"
    );
    eprintln!("  peruquiz history --user <uuid> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:peruquiz.sqlite3");
    eprintln!("  --seconds 15");
    eprintln!();
    eprintln!("Environment (same as flags, also read from .env):");
    eprintln!("  PERUQUIZ_DB_URL, PERUQUIZ_USER_ID, PERUQUIZ_QUESTION_SECS, RUST_LOG");
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.contains("mode=memory") {
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

/// Make sure the database file and its directory exist before connecting.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ArgsError> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_string(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|_| invalid())?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|_| invalid())?;
    }

    Ok(())
}
