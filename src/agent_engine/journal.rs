use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::errors::TapClawResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub ts: i64,
    pub goal: String,
    pub action: Option<serde_json::Value>,
    pub terminal: bool,
}

/// JSONL step log, one file per automation run.
pub struct SessionJournal {
    pub session_id: String,
    entries: Vec<JournalEntry>,
    file_path: std::path::PathBuf,
}

impl SessionJournal {
    pub fn new() -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let dir = data_dir_or_cwd();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            entries: Vec::new(),
            file_path,
        }
    }

    pub fn push(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Append the latest entry to the JSONL file.
    pub fn flush(&self) -> TapClawResult<()> {
        if let Some(last) = self.entries.last() {
            let line = serde_json::to_string(last)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            writeln!(file, "{}", line)?;
            tracing::debug!(
                path = %self.file_path.display(),
                "journal entry flushed"
            );
        }
        Ok(())
    }
}

impl Default for SessionJournal {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `%LOCALAPPDATA%\tapclaw\sessions` on Windows,
/// `~/.local/share/tapclaw/sessions` on Linux/macOS,
/// falling back to the current working directory.
fn data_dir_or_cwd() -> std::path::PathBuf {
    #[cfg(target_os = "windows")]
    let base = std::env::var("LOCALAPPDATA").ok().map(std::path::PathBuf::from);

    #[cfg(not(target_os = "windows"))]
    let base = std::env::var("HOME")
        .ok()
        .map(|h| std::path::PathBuf::from(h).join(".local").join("share"));

    if let Some(data_dir) = base {
        let d = data_dir.join("tapclaw").join("sessions");
        let _ = std::fs::create_dir_all(&d);
        return d;
    }
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."))
}
