// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-offset tailing of a single log file.
//!
//! Unlike a simple "last complete line" tracker, [`TailReader`] buffers a
//! pending partial line across reads so every complete line the file ever
//! contains is eventually yielded, not just the latest one at read time.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub struct TailReader {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
}

impl TailReader {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            pending: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read whatever new complete lines are available since the last call.
    ///
    /// Returns an empty vec (with offset reset to 0) if the file is
    /// currently missing. Detects truncation/rotation (`len < offset`) and
    /// restarts from the beginning.
    pub fn read_new_lines(&mut self) -> Vec<String> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => {
                self.offset = 0;
                self.pending.clear();
                return Vec::new();
            }
        };
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if len < self.offset {
            self.offset = 0;
            self.pending.clear();
        }
        if len == self.offset {
            return Vec::new();
        }
        self.read_from(file)
    }

    fn read_from(&mut self, mut file: File) -> Vec<String> {
        if file.seek(SeekFrom::Start(self.offset)).is_err() {
            return Vec::new();
        }
        let mut buf = Vec::new();
        if file.read_to_end(&mut buf).is_err() {
            return Vec::new();
        }
        self.offset += buf.len() as u64;

        self.pending.extend_from_slice(&buf);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line_bytes: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
