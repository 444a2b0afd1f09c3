mod args;

use std::io::BufRead;
use std::sync::Arc;

use args::{Args, Command, print_usage, prepare_sqlite_file};
use quiz_core::model::{OptionId, Question, ThemeId};
use quiz_core::quiz::QuizEvent;
use services::{
    Anonymous, AppServices, Clock, CurrentUser, PlayCommand, PlayEvent, QuizHandle, SignedInUser,
    share_text,
};
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const THEME_LIST_LIMIT: u32 = 100;
const HISTORY_LIMIT: u32 = 10;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.command == Command::Help {
        print_usage();
        return Ok(());
    }

    tracing::debug!(command = ?args.command, db_url = %args.db_url, "starting");
    prepare_sqlite_file(&args.db_url)?;
    let user: Arc<dyn CurrentUser> = match args.user {
        Some(id) => Arc::new(SignedInUser::new(id)),
        None => Arc::new(Anonymous),
    };
    let services =
        AppServices::new_sqlite(&args.db_url, Clock::system(), args.settings, user).await?;

    match (args.command, args.theme) {
        (Command::Play, Some(theme_id)) => play(&services, theme_id).await,
        (Command::History, _) => history(&services).await,
        _ => list_themes(&services).await,
    }
}

async fn list_themes(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let themes = services
        .themes()
        .list_visible_themes(THEME_LIST_LIMIT)
        .await?;
    if themes.is_empty() {
        println!("No themes yet. Seed some with `cargo run -p storage --bin seed`.");
        return Ok(());
    }
    for theme in themes {
        let visibility = if theme.is_public() { "" } else { " (private)" };
        println!(
            "[{}] {}{} - {} questions",
            theme.id(),
            theme.title(),
            visibility,
            theme.questions_count()
        );
        if !theme.description().is_empty() {
            println!("    {}", theme.description());
        }
    }
    Ok(())
}

async fn history(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let Some(user) = services.user_id() else {
        println!("Sign in with --user to see your history.");
        return Ok(());
    };
    let history = services.history();
    let stats = history.stats(user).await?;
    println!(
        "{} quizzes, {}/{} correct, average {}%",
        stats.quizzes_taken, stats.correct_answers, stats.total_questions, stats.average_score
    );
    for row in history.recent_results(user, HISTORY_LIMIT).await? {
        let result = &row.result;
        println!(
            "{}  {}  {}/{} ({}%)",
            result.completed_at().format("%Y-%m-%d %H:%M"),
            result.theme_name(),
            result.score(),
            result.total_questions(),
            result.percentage()
        );
    }
    Ok(())
}

/// Lines typed by the player, read on a plain thread since stdin blocks.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

enum RoundEnd {
    Again,
    Quit,
}

async fn play(services: &AppServices, theme_id: ThemeId) -> Result<(), Box<dyn std::error::Error>> {
    let quiz = services.quiz_loop();
    let mut play = quiz.start_quiz(theme_id).await?;
    let mut input = spawn_stdin_reader();
    println!("== {} ==", play.theme().title());
    println!("Type an option number to answer, Enter to continue, q to quit.");

    loop {
        let questions = play.session().questions().to_vec();
        let title = play.theme().title().to_string();
        let mut handle = services.runner().spawn(play);
        let end = play_round(services, &mut handle, &questions, &title, &mut input).await?;
        play = handle.finish().await?;
        match end {
            RoundEnd::Again if quiz.restart(&mut play).is_some() => {
                println!();
                println!("== {} (again) ==", play.theme().title());
            }
            _ => break,
        }
    }
    Ok(())
}

async fn play_round(
    services: &AppServices,
    handle: &mut QuizHandle,
    questions: &[Question],
    title: &str,
    input: &mut mpsc::Receiver<String>,
) -> Result<RoundEnd, Box<dyn std::error::Error>> {
    let tiers = services.quiz_loop().settings().tiers();
    let mut current: Option<&Question> = None;
    let mut completed = false;

    loop {
        tokio::select! {
            event = handle.next_event() => {
                let Some(event) = event else { return Ok(RoundEnd::Quit) };
                match event {
                    PlayEvent::Quiz(QuizEvent::QuestionShown { index, total, time_remaining }) => {
                        current = questions.get(index);
                        if let Some(question) = current {
                            show_question(question, index, total, time_remaining);
                        }
                    }
                    PlayEvent::Quiz(QuizEvent::Tick { remaining, .. }) => {
                        if remaining <= 5 || remaining % 5 == 0 {
                            println!("  {remaining}s");
                        }
                    }
                    PlayEvent::Quiz(QuizEvent::Answered { correct, .. }) => {
                        if correct {
                            println!("Correct!");
                        } else {
                            println!("Wrong. The answer was: {}", correct_text(current));
                        }
                        println!("(Enter to continue)");
                    }
                    PlayEvent::Quiz(QuizEvent::TimedOut { .. }) => {
                        println!("Time's up! The answer was: {}", correct_text(current));
                        println!("(Enter to continue)");
                    }
                    PlayEvent::Quiz(QuizEvent::Completed { score, total }) => {
                        completed = true;
                        let percentage = quiz_core::model::percentage(score, total);
                        println!();
                        println!("{score}/{total} ({percentage}%) - {}", tiers.tier(percentage));
                        println!("{}", share_text(title, score, total));
                    }
                    PlayEvent::Recorded(id) => {
                        println!("Result saved (#{id}). r to play again, q to quit.");
                    }
                    PlayEvent::RecordFailed(message) => {
                        println!("Could not save the result: {message}");
                        println!("retry to try again, r to play again, q to quit.");
                    }
                    PlayEvent::NotRecorded => {
                        println!("Sign in with --user to keep your history.");
                        println!("r to play again, q to quit.");
                    }
                }
            }
            line = input.recv() => {
                let Some(line) = line else { return Ok(RoundEnd::Quit) };
                match (completed, line.trim()) {
                    (_, "q" | "quit") => return Ok(RoundEnd::Quit),
                    (true, "r" | "restart") => return Ok(RoundEnd::Again),
                    (true, "retry") => handle.send(PlayCommand::RetryRecord).await?,
                    (true, _) => println!("r to play again, q to quit."),
                    (false, "") => handle.send(PlayCommand::Advance).await?,
                    (false, choice) => match pick_option(current, choice) {
                        Some(option) => handle.send(PlayCommand::Select(option)).await?,
                        None => println!("Type an option number."),
                    },
                }
            }
        }
    }
}

fn show_question(question: &Question, index: usize, total: u32, time_remaining: u32) {
    println!();
    println!("Question {}/{total} ({time_remaining}s)", index + 1);
    println!("{}", question.text());
    for (n, option) in question.options().iter().enumerate() {
        println!("  {}. {}", n + 1, option.text);
    }
}

fn correct_text(question: Option<&Question>) -> &str {
    question
        .and_then(Question::correct_option)
        .map_or("?", |option| option.text.as_str())
}

/// Maps a 1-based option number typed by the player to its option id.
fn pick_option(question: Option<&Question>, choice: &str) -> Option<OptionId> {
    let n = choice.parse::<usize>().ok()?.checked_sub(1)?;
    question?.options().get(n).map(|option| option.id)
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, QuestionId, UserId};
    use quiz_core::time::fixed_now;

    fn question() -> Question {
        Question::from_persisted(
            QuestionId::new(1),
            ThemeId::new(1),
            "¿Capital del Perú?".to_string(),
            vec![
                AnswerOption::new(OptionId::new(10), "Cusco", false),
                AnswerOption::new(OptionId::new(11), "Lima", true),
            ],
            UserId::generate(),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn option_numbers_are_one_based() {
        let q = question();
        assert_eq!(pick_option(Some(&q), "1"), Some(OptionId::new(10)));
        assert_eq!(pick_option(Some(&q), "2"), Some(OptionId::new(11)));
        assert_eq!(pick_option(Some(&q), "0"), None);
        assert_eq!(pick_option(Some(&q), "3"), None);
        assert_eq!(pick_option(Some(&q), "lima"), None);
        assert_eq!(pick_option(None, "1"), None);
    }

    #[test]
    fn correct_text_names_the_right_option() {
        let q = question();
        assert_eq!(correct_text(Some(&q)), "Lima");
        assert_eq!(correct_text(None), "?");
    }
}
