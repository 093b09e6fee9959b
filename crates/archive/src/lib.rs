// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive creation engine: compresses a server's data directory (or a
//! path within it) into a `.7z` file, as a progress-observable task body.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod compress;
pub mod filename;

pub use compress::{create_archive_task, create_extract_task, ArchiveError};
pub use filename::{generate_archive_filename, sanitize_filename_part};
