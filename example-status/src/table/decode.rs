// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::LINE_TERMINATOR;
use crate::record::ExampleStatusRecord;
use regex::Regex;
use std::sync::LazyLock;

/// Whitespace, a literal `|`, then exactly one whitespace character.
///
/// Anything past that one character belongs to the next cell, so the padding
/// of an empty cell is never mistaken for part of a separator.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\|\s").expect("separator regex is valid"));

/// Parses a table produced by [`encode`](super::encode) back into records.
///
/// The first line is the header, the second line (the divider) is skipped, and
/// every remaining non-blank line is a row. Values are returned as raw strings.
///
/// Cells are trimmed on the right only, so an all-padding cell decodes to an
/// empty value.
///
/// This is lenient: a row with fewer cells than the header produces a record
/// with fewer fields, and cells beyond the last header are ignored. Empty input
/// produces an empty list.
pub fn decode(text: &str) -> Vec<ExampleStatusRecord> {
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = split_line(header_line);

    // The divider row carries no information.
    lines.next();

    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            headers
                .iter()
                .copied()
                .zip(split_line(line))
                .collect::<ExampleStatusRecord>()
        })
        .collect()
}

fn split_line(line: &str) -> Vec<&str> {
    let line = line.trim_end();
    let line = line.strip_suffix(LINE_TERMINATOR).unwrap_or(line);
    SEPARATOR.split(line).map(str::trim_end).collect()
}
