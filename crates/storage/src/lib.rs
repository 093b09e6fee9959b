// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable keyed row storage: a JSONL journal plus atomic rewrite, built
//! for "append-only row store for a single entity type, periodically
//! compacted into itself" rather than general event-log replay.
//!
//! Every mutation (`put`/`delete`) is appended as one JSON line to a
//! journal file. On open, the journal is replayed line by line to rebuild
//! the in-memory table; any malformed line (a crash mid-write, a stray bad
//! row) is logged and skipped rather than aborting the replay, so the rows
//! that follow it still load. If any line was bad, the journal is rotated
//! to a `.bak` and recompacted so the malformed entry doesn't linger in the
//! live file — no data silently disappears.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::hash::Hash;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Implemented by row types so [`RowStore`] can index them by key.
pub trait Keyed {
    type Key: Hash + Eq + Clone;
    fn key(&self) -> Self::Key;
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Record<T> {
    Put { row: T },
    Delete { key: serde_json::Value },
}

/// A keyed table of `T` persisted as a JSONL journal.
pub struct RowStore<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
    T::Key: Serialize + DeserializeOwned,
{
    path: PathBuf,
    journal: File,
    rows: HashMap<T::Key, T>,
}

impl<T> RowStore<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
    T::Key: Serialize + DeserializeOwned,
{
    /// Open (or create) the journal at `path`, replaying its contents.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (rows, any_malformed) = Self::replay(&path)?;
        if any_malformed {
            let bak = rotate_bak_path(&path);
            warn!(path = %path.display(), bak = %bak.display(), "row-store journal had malformed lines, rotating to .bak");
            if path.exists() {
                fs::rename(&path, &bak)?;
            }
        }

        let journal = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let mut store = Self {
            path,
            journal,
            rows,
        };
        if any_malformed {
            store.compact()?;
        }
        Ok(store)
    }

    /// Replay the journal line by line. A malformed line is logged and
    /// skipped rather than treated as a corrupt tail, so one bad row in the
    /// middle of the file never costs the rows that follow it; the caller
    /// still rotates the journal to a `.bak` and recompacts if any line was
    /// bad, to drop the malformed entry from the journal on disk.
    fn replay(path: &Path) -> Result<(HashMap<T::Key, T>, bool), StoreError> {
        let mut rows = HashMap::new();
        if !path.exists() {
            return Ok((rows, false));
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut any_malformed = false;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record<T>>(&line) {
                Ok(Record::Put { row }) => {
                    rows.insert(row.key(), row);
                }
                Ok(Record::Delete { key }) => {
                    if let Ok(key) = serde_json::from_value::<T::Key>(key) {
                        rows.remove(&key);
                    }
                }
                Err(err) => {
                    any_malformed = true;
                    warn!(
                        path = %path.display(),
                        line = lineno + 1,
                        error = %err,
                        "skipping malformed row-store journal line"
                    );
                }
            }
        }
        Ok((rows, any_malformed))
    }

    pub fn put(&mut self, row: T) -> Result<(), StoreError> {
        let line = serde_json::to_string(&Record::Put { row: row.clone() })?;
        writeln!(self.journal, "{line}")?;
        self.journal.flush()?;
        self.rows.insert(row.key(), row);
        Ok(())
    }

    pub fn delete(&mut self, key: &T::Key) -> Result<(), StoreError> {
        let line = serde_json::to_string(&Record::<T>::Delete {
            key: serde_json::to_value(key)?,
        })?;
        writeln!(self.journal, "{line}")?;
        self.journal.flush()?;
        self.rows.remove(key);
        Ok(())
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.rows.get(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewrite the journal to contain exactly one `Put` per current row,
    /// dropping the accumulated mutation history. Atomic: writes to a
    /// `.tmp` file and renames over the journal.
    pub fn compact(&mut self) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for row in self.rows.values() {
                let line = serde_json::to_string(&Record::Put { row: row.clone() })?;
                writeln!(tmp, "{line}")?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        self.journal = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)?;
        Ok(())
    }
}

const MAX_BAK_FILES: u32 = 3;

fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };
    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
