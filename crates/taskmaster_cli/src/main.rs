use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskmaster_cli::cli::{self, Cli, Command};
use taskmaster_cli::logging;
use taskmaster_core::TaskStore;
use taskmaster_core::config::{self, Config, palette_for};
use taskmaster_core::error::AppError;
use taskmaster_core::model::{Filter, HistoryEntry, Priority, Task};
use taskmaster_core::monitor::{self, DeadlineMonitor, Reminder};
use taskmaster_core::notify::{self, Notifier, reminder_message};
use taskmaster_core::storage::{FileStore, json_store};
use tracing::warn;

struct Session {
    store: TaskStore<FileStore>,
    config: Config,
}

/// Everything the session loop reacts to arrives through one queue, so
/// commands and reminder sweeps never interleave.
enum Event {
    Line(String),
    Tick,
    InputClosed,
    InputFailed(String),
    Interrupt,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Priority")]
    priority: Priority,
}

fn status_label(task: &Task, overdue: bool) -> String {
    let status = if task.completed { "completed" } else { "active" };
    if overdue {
        format!("{status} (overdue)")
    } else {
        status.to_string()
    }
}

fn deadline_label(task: &Task) -> String {
    task.deadline
        .map(|deadline| deadline.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn task_json(task: &Task, overdue: bool) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "text": task.text,
        "completed": task.completed,
        "deadline": task.deadline.map(|deadline| deadline.to_string()),
        "priority": task.priority,
        "overdue": overdue,
    })
}

fn reminder_json(reminder: &Reminder) -> serde_json::Value {
    serde_json::json!({
        "id": reminder.task_id,
        "text": reminder.text,
        "deadline": reminder.deadline.to_string(),
        "priority": reminder.priority,
    })
}

fn print_task_json(session: &Session, task: &Task) {
    println!("{}", task_json(task, session.store.is_overdue(task)));
}

fn print_tasks_plain(session: &Session, filter: Filter, tasks: &[&Task]) {
    let palette = palette_for(session.store.dark_mode());

    if tasks.is_empty() {
        println!("{}", palette.mutedize("No tasks."));
    } else {
        let rows: Vec<TaskRow> = tasks
            .iter()
            .map(|task| TaskRow {
                id: task.id,
                text: task.text.clone(),
                status: status_label(task, session.store.is_overdue(task)),
                deadline: deadline_label(task),
                priority: task.priority,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    let counts = session.store.counts();
    let summary = format!(
        "Filter: {} | Active: {} | Completed: {} | Overdue: {}",
        filter, counts.active, counts.completed, counts.overdue
    );
    if counts.overdue > 0 {
        println!("{}", palette.alertize(&summary));
    } else {
        println!("{}", palette.mutedize(&summary));
    }
}

fn print_tasks_json(session: &Session, tasks: &[&Task]) {
    let payload: Vec<serde_json::Value> = tasks
        .iter()
        .map(|task| task_json(task, session.store.is_overdue(task)))
        .collect();
    println!("{}", serde_json::Value::Array(payload));
}

fn print_history_plain(session: &Session, entries: &[HistoryEntry]) {
    let palette = palette_for(session.store.dark_mode());
    if entries.is_empty() {
        println!("{}", palette.mutedize("No history yet."));
        return;
    }

    for entry in entries {
        println!(
            "{} | {} | {} ({})",
            palette.mutedize(entry.timestamp()),
            entry.action_label(),
            entry.task.text,
            entry.task.id
        );
    }
}

fn remind(session: &Session, notifier: &dyn Notifier, json: bool, quiet_when_empty: bool) {
    let outcome = monitor::sweep(session.store.tasks(), session.store.today(), notifier);

    if json {
        let payload: Vec<serde_json::Value> = outcome.reminded.iter().map(reminder_json).collect();
        if !(quiet_when_empty && payload.is_empty()) {
            println!("{}", serde_json::Value::Array(payload));
        }
    } else {
        let palette = palette_for(session.store.dark_mode());
        for reminder in &outcome.reminded {
            println!(
                "{} ({})",
                palette.alertize(&reminder_message(reminder)),
                reminder.task_id
            );
        }
        if outcome.reminded.is_empty() && outcome.failures.is_empty() && !quiet_when_empty {
            println!("{}", palette.mutedize("No tasks due today."));
        }
    }

    for failure in &outcome.failures {
        eprintln!(
            "ERROR: reminder for task {} failed: {}",
            failure.task_id, failure.error
        );
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn is_informational(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn open_session(raw_overrides: &[String]) -> Result<Session, AppError> {
    let overrides =
        cli::config_overrides_from_args(raw_overrides).map_err(AppError::invalid_input)?;
    let loaded = config::load_config_with_fallback();
    let config = config::merge_overrides(&loaded.config, &overrides);
    logging::init(config.log_level());

    if let Some(err) = loaded.error {
        warn!(error = %err, "falling back to default configuration");
    }

    let dir = json_store::store_dir(config.store_dir.as_deref())?;
    let store = TaskStore::open(FileStore::new(dir)).with_history_limit(config.history_limit());

    Ok(Session { store, config })
}

fn run_command(session: &mut Session, command: Command, json: bool) -> Result<(), AppError> {
    let result = execute(session, command, json);
    if let Some(err) = session.store.take_save_error() {
        eprintln!("WARNING: changes were not saved: {err}");
    }
    result
}

fn execute(session: &mut Session, command: Command, json: bool) -> Result<(), AppError> {
    match command {
        Command::Add {
            text,
            deadline,
            priority,
        } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };

            let task = session
                .store
                .add_task(&text, deadline, priority)
                .ok_or_else(|| AppError::invalid_input("text is required"))?;
            if json {
                print_task_json(session, &task);
            } else {
                println!("Added task: {} ({})", task.text, task.id);
            }
        }
        Command::Toggle { id } => {
            let task = session
                .store
                .toggle_task(id)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            if json {
                print_task_json(session, &task);
            } else if task.completed {
                println!("Completed task: {} ({})", task.text, task.id);
            } else {
                println!("Reopened task: {} ({})", task.text, task.id);
            }
        }
        Command::Delete { id } => {
            let task = session
                .store
                .delete_task(id)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            if json {
                print_task_json(session, &task);
            } else {
                println!("Deleted task: {} ({})", task.text, task.id);
            }
        }
        Command::ClearCompleted => {
            let removed = session.store.clear_completed();
            if json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else {
                println!("Cleared {removed} completed task(s)");
            }
        }
        Command::List { filter } => {
            let (filter, tasks) = match filter {
                Some(filter) => (filter, session.store.filtered_view(filter)),
                None => (session.store.filter(), session.store.visible_tasks()),
            };
            if json {
                print_tasks_json(session, &tasks);
            } else {
                print_tasks_plain(session, filter, &tasks);
            }
        }
        Command::Filter { filter } => {
            session.store.set_filter(filter);
            if json {
                println!("{}", serde_json::json!({ "filter": filter.label() }));
            } else {
                println!("Filter set to {filter}");
            }
        }
        Command::Stats => {
            let counts = session.store.counts();
            if json {
                println!("{}", serde_json::to_value(counts)?);
            } else {
                println!(
                    "Active: {} | Completed: {} | Overdue: {}",
                    counts.active, counts.completed, counts.overdue
                );
            }
        }
        Command::History { limit } => {
            let entries = match limit {
                Some(limit) => session.store.history().recent(limit),
                None => session.store.recent_history(),
            };
            if json {
                println!("{}", serde_json::to_value(entries)?);
            } else {
                print_history_plain(session, entries);
            }
        }
        Command::DarkMode => {
            let enabled = session.store.toggle_dark_mode();
            if json {
                println!("{}", serde_json::json!({ "dark_mode": enabled }));
            } else {
                let palette = palette_for(enabled);
                let state = if enabled { "on" } else { "off" };
                println!("{}", palette.accentize(&format!("Dark mode: {state}")));
            }
        }
        Command::Remind => {
            let notifier = notify::notifier_from_env()?;
            remind(session, notifier.as_ref(), json, false);
        }
        Command::Watch => {
            return Err(AppError::invalid_input(
                "watch cannot run inside an interactive session",
            ));
        }
    }

    Ok(())
}

fn run_watch(session: &mut Session, json: bool) -> Result<(), AppError> {
    let notifier = notify::notifier_from_env()?;
    let (tx, rx) = mpsc::channel();

    let interrupt_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(Event::Interrupt);
    })
    .map_err(|err| AppError::io(format!("failed to register Ctrl+C handler: {err}")))?;

    let mut monitor = DeadlineMonitor::new(session.config.reminder_interval());
    monitor.arm(move || tx.send(Event::Tick).is_ok())?;

    if !json {
        println!(
            "Watching deadlines every {} minute(s). Press Ctrl+C to stop.",
            monitor.interval().as_secs() / 60
        );
    }

    for event in rx.iter() {
        match event {
            Event::Tick => {
                session.store.reload();
                remind(session, notifier.as_ref(), json, true);
            }
            Event::Interrupt => break,
            Event::Line(_) | Event::InputClosed | Event::InputFailed(_) => {}
        }
    }

    monitor.disarm();
    Ok(())
}

fn spawn_stdin_reader(tx: mpsc::Sender<Event>) -> Result<(), AppError> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut stdin_lock = stdin.lock();
            let mut input = String::new();

            loop {
                input.clear();
                let event = match stdin_lock.read_line(&mut input) {
                    Ok(0) => Event::InputClosed,
                    Ok(_) => Event::Line(input.clone()),
                    Err(err) => Event::InputFailed(err.to_string()),
                };

                let finished = !matches!(event, Event::Line(_));
                if tx.send(event).is_err() || finished {
                    break;
                }
            }
        })?;

    Ok(())
}

/// Returns `false` once the session should end.
fn handle_line(session: &mut Session, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }

    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return false;
    }

    if line == "help" || line == "?" {
        print_help();
        return true;
    }

    let args = match split_command_line(line) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            return true;
        }
    };

    if args.is_empty() {
        return true;
    }

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("taskmaster".to_string());
    argv.extend(args);

    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) if is_informational(&err) => {
            let _ = err.print();
            return true;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            return true;
        }
    };

    if !cli.config_override.is_empty() {
        warn!("configuration overrides only apply when a session starts");
    }

    if let Err(err) = run_command(session, cli.command, cli.json) {
        eprintln!("ERROR: {}", err);
    }

    true
}

fn run_interactive(session: &mut Session) -> Result<(), AppError> {
    let notifier = notify::notifier_from_env()?;
    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone())?;

    let mut monitor = DeadlineMonitor::new(session.config.reminder_interval());
    monitor.arm(move || tx.send(Event::Tick).is_ok())?;

    let mut result = Ok(());
    for event in rx.iter() {
        match event {
            Event::Tick => remind(session, notifier.as_ref(), false, true),
            Event::Line(line) => {
                if !handle_line(session, &line) {
                    break;
                }
            }
            Event::InputClosed | Event::Interrupt => break,
            Event::InputFailed(message) => {
                result = Err(AppError::io(message));
                break;
            }
        }
    }

    monitor.disarm();
    result
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let result = open_session(&[]).and_then(|mut session| run_interactive(&mut session));
        if let Err(err) = result {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_informational(&err) => err.exit(),
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let json = cli.json;
    let result = open_session(&cli.config_override).and_then(|mut session| match cli.command {
        Command::Watch => run_watch(&mut session, json),
        command => run_command(&mut session, command, json),
    });

    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
