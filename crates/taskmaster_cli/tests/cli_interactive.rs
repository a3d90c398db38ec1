use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskmaster-{nanos}-{name}"))
}

fn run_interactive(store_dir: &PathBuf, input: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_taskmaster"))
        .env("TASKMASTER_STORE_DIR", store_dir)
        .env("TASKMASTER_CONFIG_PATH", store_dir.join("missing-config.json"))
        .env("TASKMASTER_DISABLE_NOTIFICATIONS", "1")
        .env_remove("TASKMASTER_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}

#[test]
fn interactive_help_shows_usage() {
    let store_dir = temp_path("interactive-help");
    let output = run_interactive(&store_dir, "help\nexit\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn interactive_invalid_command_keeps_session_alive() {
    let store_dir = temp_path("interactive-invalid");
    let output = run_interactive(&store_dir, "nope\nstats\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Active: 0 | Completed: 0 | Overdue: 0"));
}

#[test]
fn interactive_session_keeps_filter_between_commands() {
    let store_dir = temp_path("interactive-filter");
    let input = "add \"Write report\" --priority high\nadd groceries\nfilter completed\nlist\nfilter all\nlist\nquit\n";
    let output = run_interactive(&store_dir, input);

    std::fs::remove_dir_all(&store_dir).ok();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Added task: Write report ("));
    assert!(stdout.contains("Filter set to Completed"));
    assert!(stdout.contains("No tasks."));
    assert!(stdout.contains("Filter: All | Active: 2 | Completed: 0 | Overdue: 0"));
    let groceries_at = stdout.rfind("groceries").unwrap();
    let report_at = stdout.rfind("Write report").unwrap();
    assert!(groceries_at < report_at);
}

#[test]
fn interactive_rejects_watch() {
    let store_dir = temp_path("interactive-watch");
    let output = run_interactive(&store_dir, "watch\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("watch cannot run inside an interactive session"));
}

#[test]
fn interactive_ends_on_end_of_input() {
    let store_dir = temp_path("interactive-eof");
    let output = run_interactive(&store_dir, "add \"unterminated\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unterminated quote"));
}
