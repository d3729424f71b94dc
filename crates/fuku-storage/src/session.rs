//! The session file: an eventually-consistent, on-disk mirror of the set
//! of {service, pid} pairs this daemon instance has spawned, so a later
//! `stop` invocation (possibly after this process crashed) can still find
//! and reap them.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt as _;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use fuku_core::SessionError;

/// One supervised service's last-known PID and start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub service: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// The full contents of the session file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<SessionEntry>,
}

impl SessionFile {
    pub fn new(profile: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self { profile: profile.into(), started_at, entries: Vec::new() }
    }
}

/// Owns one session file on disk. All operations serialize through an
/// internal mutex, then an `fs2` advisory lock on the file itself, so
/// concurrent writers (threads in this process, or another process racing
/// on the same path) can't interleave a write.
pub struct SessionTracker {
    path: PathBuf,
    guard: Mutex<()>,
}

impl SessionTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the whole session file, atomically (write to a sibling
    /// temp file, fsync, then rename over the target).
    pub fn save(&self, state: &SessionFile) -> Result<(), SessionError> {
        let _lock = self.guard.lock();
        self.write_atomic(state)
    }

    /// Reads the current session file, or [`SessionError::NotFound`] if it
    /// doesn't exist.
    pub fn load(&self) -> Result<SessionFile, SessionError> {
        let _lock = self.guard.lock();
        self.read()?.ok_or(SessionError::NotFound)
    }

    /// Removes the session file. Not an error if it's already gone.
    pub fn delete(&self) -> Result<(), SessionError> {
        let _lock = self.guard.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Io(e)),
        }
    }

    /// Upserts `entry` by service name. Creates the file (with `profile` as
    /// its own session) if it doesn't exist yet.
    pub fn add(&self, profile: &str, now: DateTime<Utc>, entry: SessionEntry) -> Result<(), SessionError> {
        let _lock = self.guard.lock();
        let mut state = self.read()?.unwrap_or_else(|| SessionFile::new(profile, now));
        state.entries.retain(|e| e.service != entry.service);
        state.entries.push(entry);
        self.write_atomic(&state)
    }

    /// Removes the entry for `service`, if present. A no-op if the session
    /// file doesn't exist.
    pub fn remove(&self, service: &str) -> Result<(), SessionError> {
        let _lock = self.guard.lock();
        let Some(mut state) = self.read()? else { return Ok(()) };
        state.entries.retain(|e| e.service != service);
        self.write_atomic(&state)
    }

    fn read(&self) -> Result<Option<SessionFile>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::Io(e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| SessionError::Corrupted(e.to_string()))
    }

    fn write_atomic(&self, state: &SessionFile) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SessionError::Io)?;
        }
        let json = serde_json::to_vec_pretty(state).map_err(|e| SessionError::Corrupted(e.to_string()))?;
        let tmp_path = self.path.with_extension("tmp");

        let mut tmp = File::create(&tmp_path).map_err(SessionError::Io)?;
        tmp.lock_exclusive().map_err(SessionError::Io)?;
        tmp.write_all(&json).map_err(SessionError::Io)?;
        tmp.sync_all().map_err(SessionError::Io)?;
        tmp.unlock().map_err(SessionError::Io)?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(SessionError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
