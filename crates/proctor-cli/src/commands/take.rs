//! The `proctor take` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;

use proctor_core::error::SessionError;
use proctor_core::model::{ReportAck, Verdict};
use proctor_core::proctor::Proctor;
use proctor_core::review::format_clock;
use proctor_core::runner::{SessionObserver, SessionRunner};
use proctor_core::session::{Action, ExamSession, Mode, SessionSnapshot};
use proctor_store::config::{create_sink, create_store, load_config_from};

const HELP: &str = "Commands: start, select <KEY> (or just <KEY>), next, prev, submit, \
retry, review, retake, status, quit";

/// Prints the session to the terminal as events arrive.
struct ConsoleObserver {
    latest: Mutex<Option<SessionSnapshot>>,
}

impl ConsoleObserver {
    fn new(session: &ExamSession) -> Self {
        Self {
            latest: Mutex::new(Some(session.snapshot())),
        }
    }

    fn remember(&self, session: &ExamSession) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(session.snapshot());
        }
    }

    fn print_status(&self) {
        let latest = self.latest.lock().ok().and_then(|s| s.clone());
        if let Some(s) = latest {
            println!(
                "[{}] {}: question {}/{}, {} answered, {} left{}",
                s.mode,
                s.exam_name,
                s.current_index + 1,
                s.question_count,
                s.answers.len(),
                format_clock(s.seconds_remaining),
                if s.awaiting_delivery {
                    ", report not yet delivered"
                } else {
                    ""
                }
            );
        }
    }
}

impl SessionObserver for ConsoleObserver {
    fn on_tick(&self, remaining: u32) {
        if let Ok(mut latest) = self.latest.lock() {
            if let Some(s) = latest.as_mut() {
                s.seconds_remaining = remaining;
            }
        }
        if remaining > 0 && (remaining % 60 == 0 || remaining <= 10) {
            println!("  {} remaining", format_clock(remaining));
        }
    }

    fn on_action(&self, action: &Action, session: &ExamSession) {
        self.remember(session);
        match action {
            Action::Start | Action::Next | Action::Previous => match session.mode() {
                Mode::Reviewed => print_review_entry(session, session.current_index()),
                _ => print_question(session),
            },
            Action::Select { key, .. } | Action::SelectCurrent { key } => {
                println!("  Selected {key}")
            }
            Action::Submit | Action::Resubmit => println!("Submitting..."),
            Action::Review => print_review(session),
            Action::Retake => print_instructions(session),
            Action::Leave => {}
        }
    }

    fn on_time_up(&self, session: &ExamSession) {
        self.remember(session);
        println!("Time is up! Your answers were submitted automatically.");
    }

    fn on_delivered(&self, session: &ExamSession, ack: &ReportAck) {
        self.remember(session);
        if let Some(receipt) = &ack.receipt {
            println!("Report saved: {receipt}");
        }
        print_summary(session);
    }

    fn on_error(&self, error: &SessionError) {
        if error.is_invalid_action() {
            println!("  Not allowed: {error}");
        } else if error.is_retryable() {
            println!("Error: {error}. Type `retry` to submit again.");
        } else {
            println!("Error: {error}");
        }
    }
}

fn print_instructions(session: &ExamSession) {
    let exam = session.exam();
    println!("\n== {} ==", exam.name);
    if !exam.category.is_empty() {
        println!("Category: {}", exam.category);
    }
    println!("Questions:     {}", exam.question_count());
    println!("Duration:      {}", format_clock(exam.duration_secs));
    println!("Total marks:   {}", exam.total_marks);
    println!("Passing marks: {}", exam.passing_marks);
    println!("The exam is submitted automatically when the time runs out.");
    println!("Type `start` to begin.\n{HELP}");
}

fn print_question(session: &ExamSession) {
    let Some(question) = session.current_question() else {
        return;
    };
    let index = session.current_index();
    println!(
        "\nQuestion {}/{}: {}",
        index + 1,
        session.exam().question_count(),
        question.name
    );
    let selected = session.ledger().get(index);
    for (key, text) in &question.options {
        let marker = if selected == Some(key.as_str()) { '*' } else { ' ' };
        println!(" {marker} {key}) {text}");
    }
    println!("  {} remaining", format_clock(session.seconds_remaining()));
}

fn print_summary(session: &ExamSession) {
    let Some(summary) = session.summary() else {
        return;
    };
    println!("\n== Result ==");
    println!("Total marks:    {}", summary.total_marks);
    println!("Obtained marks: {}", summary.obtained_marks);
    println!("Wrong answers:  {}", summary.wrong_answers);
    println!("Passing marks:  {}", summary.passing_marks);
    println!(
        "Verdict:        {}",
        match summary.verdict {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    );
    if let Some(reference) = &summary.reference {
        println!("Study material: {reference}");
    }
    println!("Type `review` to see the answers or `retake` to try again.");
}

fn print_review(session: &ExamSession) {
    let Some(entries) = session.review_entries() else {
        return;
    };
    println!("\n== Review ==");
    for index in 0..entries.len() {
        print_review_entry(session, index);
    }
}

fn print_review_entry(session: &ExamSession, index: usize) {
    let Some(entry) = session
        .review_entries()
        .and_then(|entries| entries.into_iter().nth(index))
    else {
        return;
    };
    let submitted = match (&entry.submitted_key, &entry.submitted_text) {
        (Some(key), Some(text)) => format!("{key}) {text}"),
        (Some(key), None) => key.clone(),
        _ => "(unanswered)".to_string(),
    };
    println!(
        "{}. {} [{}]",
        entry.number,
        entry.prompt,
        if entry.is_correct { "correct" } else { "wrong" }
    );
    println!("   Submitted: {submitted}");
    println!("   Correct:   {}) {}", entry.correct_key, entry.correct_text);
}

/// A line of user input.
#[derive(Debug, PartialEq)]
enum Command {
    Act(Action),
    /// Select an option on the question under the cursor.
    Choose(String),
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let command = match head.to_lowercase().as_str() {
        "start" => Command::Act(Action::Start),
        "next" => Command::Act(Action::Next),
        "prev" | "previous" => Command::Act(Action::Previous),
        "submit" => Command::Act(Action::Submit),
        "retry" => Command::Act(Action::Resubmit),
        "review" => Command::Act(Action::Review),
        "retake" => Command::Act(Action::Retake),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "select" => Command::Choose(words.next()?.to_string()),
        _ => Command::Choose(head.to_string()),
    };
    Some(command)
}

/// Read commands from stdin on a dedicated thread, forwarding actions.
fn spawn_input(observer: Arc<ConsoleObserver>, actions: mpsc::Sender<Action>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let action = match parse_command(&line) {
                None => continue,
                Some(Command::Status) => {
                    observer.print_status();
                    continue;
                }
                Some(Command::Help) => {
                    println!("{HELP}");
                    continue;
                }
                Some(Command::Quit) => Action::Leave,
                Some(Command::Choose(key)) => Action::SelectCurrent { key },
                Some(Command::Act(action)) => action,
            };
            let leaving = action == Action::Leave;
            if actions.blocking_send(action).is_err() || leaving {
                break;
            }
        }
    });
}

pub async fn execute(
    exam_id: String,
    user: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user_id = user
        .or_else(|| config.user_id.clone())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "anonymous".to_string());

    let store = create_store(&config.store)?;
    let sink = create_sink(&config.sink)?;
    tracing::debug!(store = store.name(), sink = sink.name(), "backends ready");

    let proctor = Arc::new(Proctor::new(store, sink, config.delivery_policy()));
    let session = proctor.open(&exam_id, &user_id).await?;
    print_instructions(&session);

    let observer = Arc::new(ConsoleObserver::new(&session));
    let (tx, rx) = mpsc::channel(32);
    spawn_input(observer.clone(), tx);

    let runner =
        SessionRunner::new(proctor, observer.clone()).with_tick_period(config.tick_period());
    let session = runner.run(session, rx).await;

    if session.awaiting_delivery() {
        anyhow::bail!("left with an undelivered report for exam '{exam_id}'");
    }
    println!("Goodbye.");
    Ok(())
}
