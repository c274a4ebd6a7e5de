//! Call diary
//!
//! Append-only journal of signaling events. A record is written the moment
//! the proxy handles the corresponding INVITE / ACK / BYE, with no dialog
//! correlation: concurrent calls interleave their lines.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

pub struct CallDiary {
    path: PathBuf,
}

impl CallDiary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record the start of a call (INVITE handled).
    pub fn record_call_start(&self, origin: &str, destination: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        self.append(&format!(
            "Call record:\n\tFrom: {}\n\tTo: {}\n\tTime of calling: {}\n",
            origin, destination, stamp
        ));
    }

    /// Record the answering of a call (ACK handled).
    pub fn record_call_answered(&self) {
        let stamp = Local::now().format("%H:%M:%S");
        self.append(&format!("\tTime of answering: {}\n", stamp));
    }

    /// Record the end of a call (BYE handled).
    pub fn record_call_end(&self) {
        let stamp = Local::now().format("%H:%M:%S");
        self.append(&format!("\tTime of hanging up: {}\n", stamp));
    }

    fn append(&self, entry: &str) {
        if let Err(e) = self.try_append(entry) {
            warn!("failed to write call diary: {:#}", e);
        }
    }

    // The file handle is opened per append and released right after the
    // write, so the diary never pins a descriptor between calls.
    fn try_append(&self, entry: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(entry.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_diary() -> (CallDiary, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "siprelay-diary-{}-{}.txt",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_file(&path);
        (CallDiary::new(&path), path)
    }

    #[test]
    fn test_call_record_format() {
        let (diary, path) = temp_diary();
        diary.record_call_start("alice@example.com", "bob@example.com");
        diary.record_call_answered();
        diary.record_call_end();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Call record:\n\tFrom: alice@example.com\n\tTo: bob@example.com\n\tTime of calling: "));
        assert!(contents.contains("\tTime of answering: "));
        assert!(contents.contains("\tTime of hanging up: "));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_records_are_appended() {
        let (diary, path) = temp_diary();
        diary.record_call_start("a@h", "b@h");
        diary.record_call_start("c@h", "d@h");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("Call record:").count(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
