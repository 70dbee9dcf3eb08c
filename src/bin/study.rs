//! study CLI: run timed review sessions against the scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mastery_session::cache::QueryCache;
use mastery_session::client::{HttpBackend, InMemoryBackend, SchedulerBackend};
use mastery_session::config::{Config, SessionConfig};
use mastery_session::model::{Grade, ItemId, NoticeLevel};
use mastery_session::rating::StarFill;
use mastery_session::session::{Launch, LaunchRequest, Phase, StudySession, SubmitOutcome};
use mastery_session::telemetry::{TelemetryConfig, init_telemetry};
use mastery_session::view::{Action, Dispatched, Key, SessionView, key_action};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "study", about = "Timed, graded review sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an interactive study session
    Run {
        /// Comma-separated item ids, in order
        #[arg(long, conflicts_with = "due")]
        queue: Option<String>,
        /// Build the queue from currently due items
        #[arg(long)]
        due: bool,
        /// Where to return when the session ends
        #[arg(long)]
        return_to: Option<String>,
        /// Session tuning file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Use the built-in offline deck instead of the scheduler
        #[arg(long)]
        demo: bool,
    },
    /// List items currently due for review
    Due {
        /// Maximum items to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        demo: bool,
    },
    /// Show the next interval for each grade of one item
    Preview {
        /// Item id
        id: String,
        #[arg(long)]
        demo: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Demo runs need no scheduler, so a missing SCHEDULER_URL is not fatal here.
    let telemetry = match Config::from_env() {
        Ok(config) => TelemetryConfig::from_config(&config, "study"),
        Err(_) => TelemetryConfig {
            endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            service_name: "study".to_string(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        },
    };
    let _guard = init_telemetry(telemetry)?;

    match cli.command {
        Command::Run {
            queue,
            due,
            return_to,
            config,
            demo,
        } => {
            let session_config = match config {
                Some(path) => SessionConfig::load_from_file(&path)?,
                None => SessionConfig::default(),
            };
            let run = RunArgs {
                queue,
                due,
                return_to,
                config: session_config,
            };
            if demo {
                cmd_run(Arc::new(InMemoryBackend::demo()), run).await
            } else {
                cmd_run(Arc::new(http_backend()?), run).await
            }
        }
        Command::Due { limit, demo } => {
            if demo {
                cmd_due(&InMemoryBackend::demo(), limit).await
            } else {
                cmd_due(&http_backend()?, limit).await
            }
        }
        Command::Preview { id, demo } => {
            let id = ItemId::new(id);
            if demo {
                cmd_preview(&InMemoryBackend::demo(), &id).await
            } else {
                cmd_preview(&http_backend()?, &id).await
            }
        }
    }
}

fn http_backend() -> anyhow::Result<HttpBackend> {
    let config = Config::from_env()?;
    Ok(HttpBackend::from_config(&config)?)
}

struct RunArgs {
    queue: Option<String>,
    due: bool,
    return_to: Option<String>,
    config: SessionConfig,
}

async fn cmd_run<B: SchedulerBackend>(backend: Arc<B>, args: RunArgs) -> anyhow::Result<()> {
    let queue = if args.due {
        let ids = backend.fetch_due_queue(args.config.due_limit).await?;
        Some(ids.iter().map(ItemId::as_str).collect::<Vec<_>>().join(","))
    } else {
        args.queue
    };

    let request = LaunchRequest {
        queue,
        return_to: args.return_to,
    };
    let cache = Arc::new(QueryCache::new());
    let mut session = match StudySession::launch(backend, cache, request, &args.config) {
        Launch::Started(session) => session,
        Launch::Redirect(destination) => {
            println!("Nothing to review. Returning to {destination}");
            return Ok(());
        }
    };

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = true;

    while !session.phase().is_terminal() {
        for notice in session.take_notices() {
            print_notice(notice.level, &notice.message);
        }
        if redraw {
            render(&session.view());
            redraw = false;
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    session.exit();
                    break;
                };
                if line.trim() == ":time" {
                    println!("  {}", session.view().timer_label());
                    continue;
                }
                let Some(action) = parse_command(&line, &session.view()) else {
                    println!("  (nothing to do here; :help for commands)");
                    continue;
                };
                match session.dispatch(action).await {
                    Ok(Dispatched::Exited(destination)) => {
                        println!("Left the session. Returning to {destination}");
                    }
                    Ok(Dispatched::Submitted(SubmitOutcome::Completed { destination, stats })) => {
                        println!(
                            "Reviewed {} item(s), {} correct. Returning to {destination}",
                            stats.reviewed, stats.correct
                        );
                    }
                    Ok(Dispatched::Submitted(SubmitOutcome::NotReady)) => {
                        println!("  select a grade first");
                    }
                    Ok(_) => {}
                    Err(e) => println!("  {e}"),
                }
                redraw = true;
            }
            Some(_) = session.next_update(), if session.in_flight() > 0 => {
                redraw = true;
            }
        }
    }

    for notice in session.take_notices() {
        print_notice(notice.level, &notice.message);
    }
    Ok(())
}

async fn cmd_due<B: SchedulerBackend>(backend: &B, limit: usize) -> anyhow::Result<()> {
    let ids = backend.fetch_due_queue(limit).await?;
    if ids.is_empty() {
        println!("Nothing due.");
        return Ok(());
    }

    println!("{:<8}  {:<10}  TITLE", "ID", "STATE");
    println!("{}", "-".repeat(60));
    for id in &ids {
        match backend.fetch_item(id).await {
            Ok(item) => println!(
                "{:<8}  {:<10}  {}",
                id.short(),
                item.scheduler_state.to_string(),
                item.title
            ),
            Err(e) => println!("{:<8}  {:<10}  ({e})", id.short(), "?"),
        }
    }
    println!("\n{} item(s) due", ids.len());
    println!("queue: {}", ids.iter().map(ItemId::as_str).collect::<Vec<_>>().join(","));
    Ok(())
}

async fn cmd_preview<B: SchedulerBackend>(backend: &B, id: &ItemId) -> anyhow::Result<()> {
    let intervals = backend.fetch_interval_preview(id).await?;
    for grade in Grade::ALL {
        let label = intervals.get(&grade).map(String::as_str).unwrap_or("-");
        println!("{} {:<6} {label}", grade.value(), grade.label());
    }
    Ok(())
}

/// Turn one input line into an action for the current view.
///
/// Key-like commands go through the view's key map so the terminal and any
/// other front end share the same bindings.
fn parse_command(line: &str, view: &SessionView<'_>) -> Option<Action> {
    let trimmed = line.trim();
    let key = match trimmed {
        "" | ":reveal" => Some(Key::Space),
        ":submit" => Some(Key::Enter),
        ":back" => Some(Key::Backspace),
        ":exit" | ":q" => Some(Key::Escape),
        ":reload" => Some(Key::Char('r')),
        ":1" | ":2" | ":3" | ":4" => trimmed.chars().nth(1).map(Key::Char),
        _ => None,
    };
    if let Some(key) = key {
        return key_action(view, key);
    }

    if let Some(star) = trimmed.strip_prefix(":star ") {
        return star.trim().parse().ok().map(Action::ClickStar);
    }
    if let Some(text) = line.trim_start().strip_prefix(":log ") {
        return Some(Action::SetErrorLog(append(view.error_log, text)));
    }
    if trimmed == ":help" {
        print_help();
        return None;
    }
    if trimmed.starts_with(':') {
        return None;
    }

    match view.phase {
        Phase::Answering => Some(Action::SetAnswer(append(view.answer, line))),
        Phase::Grading if view.error_log_visible => {
            Some(Action::SetErrorLog(append(view.error_log, line)))
        }
        _ => None,
    }
}

fn append(existing: &str, line: &str) -> String {
    if existing.is_empty() {
        line.to_string()
    } else {
        format!("{existing}\n{line}")
    }
}

fn render(view: &SessionView<'_>) {
    println!();
    println!(
        "[{}] {}%  {}  {}",
        view.progress,
        view.progress.percentage(),
        view.timer_label(),
        view.phase
    );

    match (view.phase, view.item) {
        (Phase::Loading, _) => match view.load_error {
            Some(error) => println!("Failed to load item: {error}  (:reload to retry)"),
            None => println!("Loading..."),
        },
        (_, Some(item)) => {
            let badge = view.badge().unwrap_or_default();
            println!("{}  [{}] [{badge}]", item.title, item.node_type);
            if !item.body.is_empty() {
                println!("{}", item.body);
            }
        }
        _ => {}
    }

    match view.phase {
        Phase::Answering => {
            if !view.answer.is_empty() {
                println!("answer: {}", view.answer);
            }
            println!("(type your answer; empty line or :reveal to grade)");
        }
        Phase::Grading => {
            if !view.answer.is_empty() {
                println!("your answer: {}", view.answer);
            }
            let buttons: Vec<String> = view
                .grades
                .iter()
                .map(|slot| {
                    let mark = if slot.selected { "*" } else { " " };
                    format!("{mark}{} {} ({})", slot.shortcut, slot.label, slot.interval)
                })
                .collect();
            println!("{}", buttons.join("  "));
            println!("difficulty {} {}", stars(view), view.difficulty);
            if view.error_log_visible {
                println!("error log: {}", view.error_log);
            }
            if let Some(error) = view.submit_error {
                println!("last submit failed: {error} (:submit to retry)");
            }
        }
        _ => {}
    }
}

fn stars(view: &SessionView<'_>) -> String {
    view.stars
        .iter()
        .map(|fill| match fill {
            StarFill::Full => '★',
            StarFill::Half => '◐',
            StarFill::Empty => '☆',
        })
        .collect()
}

fn print_notice(level: NoticeLevel, message: &str) {
    match level {
        NoticeLevel::Success => println!("✓ {message}"),
        NoticeLevel::Error => println!("✗ {message}"),
    }
}

fn print_help() {
    println!("commands: <text> answer | <enter>/:reveal | :1-:4 grade | :star N | :log text");
    println!("          :submit | :back | :reload | :time | :exit");
}
