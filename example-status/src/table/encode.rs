// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{CELL_SEPARATOR, DIVIDER_CHAR, LINE_TERMINATOR};
use crate::record::ExampleStatusRecord;
use swrite::{SWrite, swrite};

/// Renders `records` as an aligned text table.
///
/// The header row is taken from the field names of the first record, and every
/// row is rendered in that column order. All records are expected to have the
/// same field names; this is not validated.
///
/// Returns `None` for an empty list.
pub fn encode(records: &[ExampleStatusRecord]) -> Option<String> {
    let first = records.first()?;
    let headers: Vec<&str> = first.field_names().collect();
    let widths = ColumnWidths::compute(&headers, records);

    let mut out = String::new();
    widths.write_row(&mut out, headers.iter().copied());
    widths.write_divider(&mut out);
    for record in records {
        widths.write_row(&mut out, record.values());
    }
    Some(out)
}

/// Per-column widths, in characters.
#[derive(Debug)]
struct ColumnWidths {
    widths: Vec<usize>,
}

impl ColumnWidths {
    fn compute(headers: &[&str], records: &[ExampleStatusRecord]) -> Self {
        let mut widths: Vec<usize> = headers.iter().map(|h| char_width(h)).collect();
        for record in records {
            for (width, value) in widths.iter_mut().zip(record.values()) {
                *width = (*width).max(char_width(value));
            }
        }
        Self { widths }
    }

    fn write_row<'a>(&self, out: &mut String, cells: impl Iterator<Item = &'a str>) {
        for (i, (cell, width)) in cells.zip(&self.widths).enumerate() {
            if i > 0 {
                out.push_str(CELL_SEPARATOR);
            }
            swrite!(out, "{cell:<width$}");
        }
        out.push_str(LINE_TERMINATOR);
        out.push('\n');
    }

    fn write_divider(&self, out: &mut String) {
        for (i, width) in self.widths.iter().enumerate() {
            if i > 0 {
                out.push_str(CELL_SEPARATOR);
            }
            out.extend(std::iter::repeat_n(DIVIDER_CHAR, *width));
        }
        out.push_str(LINE_TERMINATOR);
        out.push('\n');
    }
}

fn char_width(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_list_has_no_output() {
        assert_eq!(encode(&[]), None);
    }

    #[test]
    fn header_wider_than_values() {
        let records = vec![ExampleStatusRecord::from_fields([
            ("example_id", "a[1]"),
            ("status", "ok"),
        ])];
        assert_eq!(
            encode(&records).unwrap(),
            indoc! {"
                example_id | status |
                ---------- | ------ |
                a[1]       | ok     |
            "}
        );
    }

    #[test]
    fn widths_count_characters() {
        let records = vec![
            ExampleStatusRecord::from_fields([("name", "héllo"), ("n", "1")]),
            ExampleStatusRecord::from_fields([("name", "x"), ("n", "22")]),
        ];
        assert_eq!(
            encode(&records).unwrap(),
            indoc! {"
                name  | n  |
                ----- | -- |
                héllo | 1  |
                x     | 22 |
            "}
        );
    }

    #[test]
    fn single_column() {
        let records = vec![ExampleStatusRecord::from_fields([("id", "a")])];
        assert_eq!(encode(&records).unwrap(), "id |\n-- |\na  |\n");
    }

    #[test]
    fn uses_first_record_field_order() {
        let records = vec![
            ExampleStatusRecord::from_fields([("b", "1"), ("a", "2")]),
            ExampleStatusRecord::from_fields([("b", "3"), ("a", "4")]),
        ];
        assert_eq!(
            encode(&records).unwrap(),
            "b | a |\n- | - |\n1 | 2 |\n3 | 4 |\n"
        );
    }
}
