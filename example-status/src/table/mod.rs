// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The on-disk table format for example statuses.
//!
//! The format is a fixed-width, human-diffable text table:
//!
//! ```text
//! example_id            | status | run_time |
//! --------------------- | ------ | -------- |
//! spec/foo_spec.rb[1:1] | passed | 0.001    |
//! spec/foo_spec.rb[1:2] | failed | 0.002    |
//! ```
//!
//! Values may be empty. They must not end with whitespace, and must not contain
//! newlines or a `|` preceded by whitespace. Under those conditions [`decode`]
//! is the inverse of [`encode`] for any non-empty list of records.

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

/// The separator between cells.
pub const CELL_SEPARATOR: &str = " | ";

/// The terminator at the end of each line.
pub const LINE_TERMINATOR: &str = " |";

/// The character used to draw the divider row.
pub const DIVIDER_CHAR: char = '-';
