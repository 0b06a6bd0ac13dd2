//! Append-only JSON Lines trajectory file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::types::LogEntry;

/// Append `entries` as one JSON object per line and fsync the file.
pub fn append_entries(path: &Path, entries: &[LogEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut buf = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut buf, entry).context("serialize log entry")?;
        buf.push(b'\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open trajectory log {}", path.display()))?;
    file.write_all(&buf)
        .with_context(|| format!("append trajectory log {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync trajectory log {}", path.display()))?;
    debug!(path = %path.display(), appended = entries.len(), "trajectory appended");
    Ok(())
}

/// Parsed trajectory file.
#[derive(Debug, Default)]
pub struct TrajectoryLog {
    pub entries: Vec<LogEntry>,
    /// The file does not end on a line boundary, so an append was cut short.
    pub torn: bool,
}

/// Read every entry. A missing file is an empty log.
///
/// An unterminated final line that does not parse is the remains of an interrupted
/// append and is dropped. Any other unparsable line is an error.
pub fn read_log(path: &Path) -> Result<TrajectoryLog> {
    if !path.exists() {
        return Ok(TrajectoryLog::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read trajectory log {}", path.display()))?;
    let torn = !contents.is_empty() && !contents.ends_with('\n');
    let lines: Vec<&str> = contents.lines().collect();

    let mut entries = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(err) if torn && index + 1 == lines.len() => {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %err,
                    "dropping torn trailing trajectory line"
                );
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("parse trajectory log {} line {}", path.display(), index + 1)
                });
            }
        }
    }
    Ok(TrajectoryLog { entries, torn })
}

pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    Ok(read_log(path)?.entries)
}
