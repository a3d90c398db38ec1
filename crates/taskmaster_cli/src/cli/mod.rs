use clap::{Parser, Subcommand};
use taskmaster_core::config::{ConfigOverrides, canonical_log_level};
use taskmaster_core::model::{Filter, Priority, parse_deadline};
use time::Date;

#[derive(Parser, Debug)]
#[command(name = "taskmaster", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskmaster add "Write report" --deadline 2024-01-01 --priority high
    Add {
        text: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_deadline_arg)]
        deadline: Option<Date>,
        #[arg(long, short = 'p', default_value = "medium", value_parser = parse_priority_arg)]
        priority: Priority,
    },
    /// Mark a task completed, or reopen a completed task
    ///
    /// Example: taskmaster toggle 1718000000000
    Toggle {
        id: u64,
    },
    /// Delete a task
    ///
    /// Example: taskmaster delete 1718000000000
    Delete {
        id: u64,
    },
    /// Remove every completed task
    ClearCompleted,
    /// List tasks
    ///
    /// Example: taskmaster list
    /// Example: taskmaster list active
    List {
        #[arg(value_parser = parse_filter_arg)]
        filter: Option<Filter>,
    },
    /// Set the filter used by `list` for the rest of the session
    ///
    /// Example: filter completed
    Filter {
        #[arg(value_parser = parse_filter_arg)]
        filter: Filter,
    },
    /// Show active, completed and overdue counts
    Stats,
    /// Show recent completions and deletions
    ///
    /// Example: taskmaster history --limit 5
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Toggle dark mode output
    DarkMode,
    /// Send reminders for tasks due today
    Remind,
    /// Send reminders on a timer until interrupted
    Watch,
}

fn parse_deadline_arg(raw: &str) -> Result<Date, String> {
    parse_deadline(raw).map_err(|err| err.message().to_string())
}

fn parse_priority_arg(raw: &str) -> Result<Priority, String> {
    raw.parse::<Priority>()
        .map_err(|err| err.message().to_string())
}

fn parse_filter_arg(raw: &str) -> Result<Filter, String> {
    raw.parse::<Filter>().map_err(|err| err.message().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    StoreDir,
    ReminderIntervalMinutes,
    HistoryLimit,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "store_dir" => ConfigOverrideTarget::StoreDir,
        "reminder_interval_minutes" | "reminder_interval" => {
            ConfigOverrideTarget::ReminderIntervalMinutes
        }
        "history_limit" => ConfigOverrideTarget::HistoryLimit,
        "log_level" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` argument into one set of overrides; later
/// arguments win.
pub fn config_overrides_from_args(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();

    for argument in raw {
        let parsed = parse_config_override(argument)?;
        match parsed.target {
            ConfigOverrideTarget::StoreDir => {
                if parsed.value.is_empty() {
                    return Err("store_dir override cannot be empty".to_string());
                }
                overrides.store_dir = Some(parsed.value);
            }
            ConfigOverrideTarget::ReminderIntervalMinutes => {
                let minutes = parsed
                    .value
                    .parse::<u64>()
                    .map_err(|_| "reminder_interval_minutes must be a whole number".to_string())?;
                overrides.reminder_interval_minutes = Some(minutes);
            }
            ConfigOverrideTarget::HistoryLimit => {
                let limit = parsed
                    .value
                    .parse::<usize>()
                    .map_err(|_| "history_limit must be a whole number".to_string())?;
                overrides.history_limit = Some(limit);
            }
            ConfigOverrideTarget::LogLevel => {
                if canonical_log_level(&parsed.value).is_none() {
                    return Err(format!("unknown log level '{}'", parsed.value));
                }
                overrides.log_level = Some(parsed.value);
            }
        }
    }

    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
