//! Durable mission state under a state directory.
//!
//! Layout:
//! - `trajectory.jsonl`: every trajectory entry, appended and fsync'd first
//! - `mission.json`: full record snapshot, replaced atomically afterwards
//!
//! A crash between the two writes leaves log entries the snapshot does not know
//! about. `load` drops that tail so the log and snapshot agree again, and the
//! interrupted step is simply re-run. A crash inside the append leaves a partial
//! final line, which `open` cuts off before anything else touches the log.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::core::types::LogEntry;
use crate::io::config::write_atomic;
use crate::io::trajectory_log::{append_entries, read_entries, read_log};
use crate::mission::MissionRecord;

const SNAPSHOT_FILE: &str = "mission.json";
const TRAJECTORY_FILE: &str = "trajectory.jsonl";

#[derive(Debug)]
pub struct MissionStore {
    dir: PathBuf,
    /// Entries already durable in the trajectory log.
    persisted: usize,
}

impl MissionStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create state dir {}", dir.display()))?;
        let log = read_log(&dir.join(TRAJECTORY_FILE))?;
        let store = Self {
            dir: dir.to_path_buf(),
            persisted: log.entries.len(),
        };
        if log.torn {
            store.rewrite_log(&log.entries)?;
        }
        Ok(store)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn trajectory_path(&self) -> PathBuf {
        self.dir.join(TRAJECTORY_FILE)
    }

    /// Load the persisted mission, if any.
    ///
    /// Fails when the snapshot trajectory is not a prefix of the log.
    pub fn load(&mut self) -> Result<Option<MissionRecord>> {
        let snapshot_path = self.snapshot_path();
        if !snapshot_path.exists() {
            if self.persisted > 0 {
                warn!(
                    dropped = self.persisted,
                    "discarding trajectory log with no snapshot"
                );
                self.rewrite_log(&[])?;
                self.persisted = 0;
            }
            return Ok(None);
        }
        let contents = fs::read_to_string(&snapshot_path)
            .with_context(|| format!("read snapshot {}", snapshot_path.display()))?;
        let record: MissionRecord = serde_json::from_str(&contents)
            .with_context(|| format!("parse snapshot {}", snapshot_path.display()))?;

        let log = read_entries(&self.trajectory_path())?;
        let snapshot_entries = record.trajectory().entries();
        if log.len() < snapshot_entries.len() || log[..snapshot_entries.len()] != *snapshot_entries
        {
            bail!(
                "snapshot {} disagrees with trajectory log {}",
                snapshot_path.display(),
                self.trajectory_path().display()
            );
        }
        if log.len() > snapshot_entries.len() {
            warn!(
                dropped = log.len() - snapshot_entries.len(),
                "discarding trajectory tail written after the last snapshot"
            );
            self.rewrite_log(snapshot_entries)?;
        }
        self.persisted = snapshot_entries.len();
        debug!(
            mission_id = record.mission_id(),
            status = %record.status,
            entries = self.persisted,
            "mission loaded"
        );
        Ok(Some(record))
    }

    /// Append new trajectory entries, then replace the snapshot.
    pub fn persist(&mut self, record: &MissionRecord) -> Result<()> {
        let entries = record.trajectory().entries();
        if entries.len() < self.persisted {
            bail!(
                "trajectory shrank from {} to {} entries",
                self.persisted,
                entries.len()
            );
        }
        append_entries(&self.trajectory_path(), &entries[self.persisted..])?;
        self.persisted = entries.len();

        let mut buf = serde_json::to_string_pretty(record).context("serialize mission record")?;
        buf.push('\n');
        write_atomic(&self.snapshot_path(), buf.as_bytes())?;
        debug!(
            mission_id = record.mission_id(),
            status = %record.status,
            entries = self.persisted,
            "mission persisted"
        );
        Ok(())
    }

    fn rewrite_log(&self, entries: &[LogEntry]) -> Result<()> {
        let mut buf = Vec::new();
        for entry in entries {
            serde_json::to_writer(&mut buf, entry).context("serialize log entry")?;
            buf.push(b'\n');
        }
        write_atomic(&self.trajectory_path(), &buf)
    }
}
