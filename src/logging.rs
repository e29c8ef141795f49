use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// Observability sink for this layer: an append-only session log under the
// state root. Fetch and render failures land here; none of them are fatal.

pub fn session_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/session.log")
}

pub fn append_session_log_line(state_root: &Path, line: &str) -> std::io::Result<()> {
    let path = session_log_path(state_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(file, "{line}")
}

pub fn log_event(state_root: &Path, message: &str) {
    let stamped = format!("{} {message}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"));
    let _ = append_session_log_line(state_root, &stamped);
}
