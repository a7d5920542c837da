//! Key-value storage for teamtodo
//!
//! A data directory plays the role of a browser profile's local storage:
//! every key is one JSON document on disk.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   teamtodo.toml                 # Optional configuration
//!   team_info.json                # Active team context (single slot)
//!   notification_settings.json    # { "enabled": bool }
//!   notification_permission.json  # Terminal notification permission
//!   team_<code>_tasks.json        # Task collection for one team
//!   team_<code>_tasks.lock        # Writer lock for that collection
//! ```
//!
//! Team codes are free text, so key names are percent-encoded into file
//! names (see [`encode_key`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Single global slot holding the active team context
pub const TEAM_INFO_KEY: &str = "team_info";

/// Global notification preference
pub const NOTIFICATION_SETTINGS_KEY: &str = "notification_settings";

/// Persisted permission for the terminal notification platform
pub const NOTIFICATION_PERMISSION_KEY: &str = "notification_permission";

const VALUE_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";
const TEAM_TASKS_PATTERN: &str = "team_*_tasks";

/// Storage key of a team's task collection
pub fn team_tasks_key(team_code: &str) -> String {
    format!("team_{team_code}_tasks")
}

/// Whether `key` names a team task collection (`team_*_tasks`).
pub fn is_team_tasks_key(key: &str) -> bool {
    glob::Pattern::new(TEAM_TASKS_PATTERN)
        .map(|pattern| pattern.matches(key))
        .unwrap_or(false)
}

/// Encode a key into a file stem.
///
/// `[A-Za-z0-9_.-]` pass through; every other byte becomes `%XX`.
pub fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Reverse of [`encode_key`]; `None` for malformed input.
pub fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = stem.get(idx + 1..idx + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Map a file in the data directory back to its key.
///
/// Only `*.json` value files map to keys; lock and temp files do not.
pub fn key_for_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    decode_key(stem)
}

/// Whether the write-back of a [`Storage::mutate_json`] cycle happens.
#[derive(Debug)]
pub enum Commit<R> {
    /// Persist the mutated value and return `R`
    Write(R),
    /// Leave the stored value untouched and return `R`
    Keep(R),
}

/// Storage manager rooted at a data directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    /// Create a storage manager for the given data directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Override how long writers wait for a key's lock
    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Data directory root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the data directory if missing
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// File holding the value of `key`
    pub fn value_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{VALUE_EXTENSION}", encode_key(key)))
    }

    /// Lock file guarding writes to `key`
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{LOCK_EXTENSION}", encode_key(key)))
    }

    // =========================================================================
    // Value access
    // =========================================================================

    /// Raw stored text, `None` when absent
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Decode the value under `key`.
    ///
    /// Absent keys are `Ok(None)`; undecodable content is `CorruptData`, so
    /// callers can tell "empty" apart from "failed to read".
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(content) = self.get_raw(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| Error::CorruptData {
                key: key.to_string(),
                message: err.to_string(),
            })
    }

    /// Replace the value under `key` atomically (no lock held)
    pub fn write_json<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(self.value_path(key), json.as_bytes())?;
        tracing::debug!(key, bytes = json.len(), "stored value");
        Ok(())
    }

    /// Delete the value under `key`; `false` when nothing was stored
    pub fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => {
                tracing::debug!(key, "removed value");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Locked read-modify-write of the value under `key`.
    ///
    /// Missing values start from `T::default()`. A corrupt value aborts the
    /// cycle with `CorruptData` instead of being overwritten. The closure's
    /// [`Commit`] decides whether the mutated value is written back; an
    /// error from the closure leaves the stored value untouched.
    pub fn mutate_json<T, R, F>(&self, key: &str, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<Commit<R>>,
    {
        self.init()?;
        let _lock = FileLock::acquire(self.lock_path(key), self.lock_timeout_ms)?;

        let mut value: T = self.read_json(key)?.unwrap_or_default();
        match f(&mut value)? {
            Commit::Write(result) => {
                self.write_json(key, &value)?;
                Ok(result)
            }
            Commit::Keep(result) => Ok(result),
        }
    }
}
