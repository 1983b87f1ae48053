//! Flat append-only transcript of completed turns.
//!
//! Four lines per turn: a literal label, the raw user input, the raw model
//! response, and the elapsed time. Not structured, not escaped, never parsed
//! back in.

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct TranscriptWriter {
    path: PathBuf,
}

impl TranscriptWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn append_turn(&self, user_input: &str, response: &str, elapsed: Duration) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "user input: ")?;
        writeln!(file, "{}", user_input)?;
        writeln!(file, "{}", response)?;
        writeln!(file, "elapsed time: {:.2}s", elapsed.as_secs_f64())?;
        Ok(())
    }
}
