//! Command-line access to a classlog store.
//!
//! # Responsibility
//! - Open the store named by an engine config file.
//! - Run one history operation and print the outcome.
//!
//! Usage: `classlog_cli <config.json> <status|history|undo|redo|revert N>`

use classlog_core::{
    default_log_level, init_logging, EngineConfig, HistoryManager, NotificationSink, Store,
};
use log::error;
use std::process::ExitCode;

const USAGE: &str = "usage: classlog_cli <config.json> <status|history|undo|redo|revert N>";

/// Prints status lines as they arrive.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn on_state_changed(&mut self) {}

    fn on_status(&mut self, text: &str) {
        println!("{text}");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Status,
    History,
    Undo,
    Redo,
    Revert(usize),
}

fn parse_action(args: &[String]) -> Result<Action, String> {
    match args {
        [name] if name == "status" => Ok(Action::Status),
        [name] if name == "history" => Ok(Action::History),
        [name] if name == "undo" => Ok(Action::Undo),
        [name] if name == "redo" => Ok(Action::Redo),
        [name, index] if name == "revert" => index
            .parse()
            .map(Action::Revert)
            .map_err(|_| format!("revert needs a history index, got `{index}`")),
        _ => Err(USAGE.to_string()),
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let (config_path, rest) = args.split_first().ok_or_else(|| USAGE.to_string())?;
    let action = parse_action(rest)?;

    let config = EngineConfig::load(config_path).map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let store = config.open_store().map_err(|err| err.to_string())?;
    let mut history = HistoryManager::open(store, StdoutSink, config.retention());
    for warning in history.load_warnings() {
        eprintln!("skipped record: {warning}");
    }

    match action {
        Action::Status => print_status(&history),
        Action::History => {
            for entry in history.history() {
                println!(
                    "{:>4}  {}  {}",
                    entry.index,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.description
                );
            }
        }
        Action::Undo => {
            history.undo().map_err(|err| err.to_string())?;
        }
        Action::Redo => {
            history.redo().map_err(|err| err.to_string())?;
        }
        Action::Revert(index) => {
            history.revert_to(index).map_err(|err| err.to_string())?;
        }
    }

    if history.has_unsaved_changes() {
        history.flush().map_err(|err| err.to_string())?;
    }
    Ok(())
}

fn print_status<S: Store, N: NotificationSink>(history: &HistoryManager<S, N>) {
    let state = history.state();
    let report = history.load_report();
    println!("backend={}", history.store().backend());
    println!(
        "students={} furniture={} groups={}",
        state.students.len(),
        state.furniture.len(),
        state.groups.len()
    );
    println!(
        "behavior_log={} homework_log={}",
        state.behavior_log.len(),
        state.homework_log.len()
    );
    println!(
        "undo={} redo={} pruned={} skipped={}",
        history.undo_len(),
        history.redo_len(),
        report.pruned,
        report.warnings.len()
    );
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_action, Action};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_known_actions() {
        assert_eq!(parse_action(&args(&["status"])), Ok(Action::Status));
        assert_eq!(parse_action(&args(&["revert", "3"])), Ok(Action::Revert(3)));
    }

    #[test]
    fn rejects_bad_revert_index() {
        let err = parse_action(&args(&["revert", "x"])).unwrap_err();
        assert!(err.contains("history index"));
        assert!(parse_action(&args(&["frobnicate"])).is_err());
    }
}
