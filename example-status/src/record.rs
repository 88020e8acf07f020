// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The record model shared by the merger and the table codec.

use crate::errors::{ScopedIdParseError, ScopedIdParseErrorReason};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// The field holding the example ID.
pub const EXAMPLE_ID_FIELD: &str = "example_id";

/// The field holding the status.
pub const STATUS_FIELD: &str = "status";

/// The field holding the run time, if the caller records one.
pub const RUN_TIME_FIELD: &str = "run_time";

/// The status for an example that was loaded but not executed in this run.
pub const UNKNOWN_STATUS: &str = "unknown";

/// The status for an example that passed.
pub const PASSED_STATUS: &str = "passed";

/// The status for an example that failed.
pub const FAILED_STATUS: &str = "failed";

/// The status for an example that is pending.
pub const PENDING_STATUS: &str = "pending";

/// The status of a single example, as an ordered mapping of field names to
/// values.
///
/// All records within a list are expected to share the same field names in the
/// same order. This is not validated.
///
/// Equality is field-for-field and order-sensitive.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExampleStatusRecord {
    fields: IndexMap<String, String>,
}

impl ExampleStatusRecord {
    /// Creates a new record with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record from an iterator of `(name, value)` pairs, in order.
    ///
    /// If a name occurs more than once, the last value wins but the field keeps
    /// its first position.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        fields.into_iter().collect()
    }

    /// Returns this record with the given field appended (or replaced, if it
    /// already exists).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the value of the given field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the `example_id` field.
    pub fn example_id(&self) -> Option<&str> {
        self.get(EXAMPLE_ID_FIELD)
    }

    /// Returns the `status` field.
    pub fn status(&self) -> Option<&str> {
        self.get(STATUS_FIELD)
    }

    /// Returns true if this example was loaded but not executed.
    pub fn is_unknown(&self) -> bool {
        self.status() == Some(UNKNOWN_STATUS)
    }

    /// Iterates over field names, in order.
    pub fn field_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates over field values, in order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.fields.values().map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs, in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &str)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for ExampleStatusRecord {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap's own equality ignores order.
        self.fields.iter().eq(other.fields.iter())
    }
}

impl Eq for ExampleStatusRecord {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExampleStatusRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A borrowed example ID of the form `<spec_file>[<scoped id>]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExampleId<'a> {
    id: &'a str,
}

impl<'a> ExampleId<'a> {
    /// Wraps an example ID string.
    pub fn new(id: &'a str) -> Self {
        Self { id }
    }

    /// Returns the full ID.
    pub fn as_str(&self) -> &'a str {
        self.id
    }

    /// Returns the spec file: everything before the first `[`.
    ///
    /// If there is no `[`, the whole ID is the spec file.
    pub fn spec_file(&self) -> &'a str {
        match self.id.find('[') {
            Some(idx) => &self.id[..idx],
            None => self.id,
        }
    }

    /// Parses the bracketed suffix into a [`ScopedId`].
    ///
    /// An ID without a `[` has an empty scoped ID.
    pub fn scoped_id(&self) -> Result<ScopedId, ScopedIdParseError> {
        let Some(idx) = self.id.find('[') else {
            return Ok(ScopedId::default());
        };
        let error = |reason| ScopedIdParseError::new(self.id, reason);

        let inner = self.id[idx + 1..]
            .strip_suffix(']')
            .ok_or_else(|| error(ScopedIdParseErrorReason::MissingClosingBracket))?;

        let mut components = SmallVec::new();
        for (index, component) in inner.split(':').enumerate() {
            if component.is_empty() {
                return Err(error(ScopedIdParseErrorReason::EmptyComponent { index }));
            }
            // u64::from_str accepts a leading `+`, which is not part of the grammar.
            if !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(error(ScopedIdParseErrorReason::InvalidComponent {
                    component: component.to_owned(),
                }));
            }
            let value = component.parse::<u64>().map_err(|_| {
                error(ScopedIdParseErrorReason::ComponentOutOfRange {
                    component: component.to_owned(),
                })
            })?;
            components.push(value);
        }

        Ok(ScopedId { components })
    }
}

impl fmt::Display for ExampleId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

/// The position of an example within its spec file's nested groups, e.g.
/// `1:2:3`.
///
/// Ordering is numeric and element-wise; a prefix sorts before any longer
/// sequence it is a prefix of.
///
/// Each component is stored as a `u64`, so components above `u64::MAX` fail to
/// parse with [`ScopedIdParseErrorReason::ComponentOutOfRange`].
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopedId {
    components: SmallVec<[u64; 4]>,
}

impl ScopedId {
    /// Returns the components of this scoped ID.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl fmt::Display for ScopedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("spec/foo_spec.rb[1:2]", "spec/foo_spec.rb" ; "basic")]
    #[test_case("spec/foo_spec.rb", "spec/foo_spec.rb" ; "no brackets")]
    #[test_case("spec/a[b]_spec.rb[1]", "spec/a" ; "first bracket wins")]
    #[test_case("[1:1]", "" ; "empty spec file")]
    fn spec_file(id: &str, expected: &str) {
        assert_eq!(ExampleId::new(id).spec_file(), expected);
    }

    #[test_case("a_spec.rb[1]", &[1] ; "single")]
    #[test_case("a_spec.rb[1:10:3]", &[1, 10, 3] ; "nested")]
    #[test_case("a_spec.rb[007]", &[7] ; "leading zeros")]
    #[test_case("a_spec.rb[18446744073709551615]", &[u64::MAX] ; "u64 max")]
    #[test_case("a_spec.rb", &[] ; "no scoped id")]
    fn scoped_id_valid(id: &str, expected: &[u64]) {
        let scoped = ExampleId::new(id).scoped_id().expect("valid scoped id");
        assert_eq!(scoped.components(), expected);
    }

    #[test_case("a_spec.rb[1:2", ScopedIdParseErrorReason::MissingClosingBracket ; "unclosed")]
    #[test_case("a_spec.rb[]", ScopedIdParseErrorReason::EmptyComponent { index: 0 } ; "empty")]
    #[test_case("a_spec.rb[1::2]", ScopedIdParseErrorReason::EmptyComponent { index: 1 } ; "double colon")]
    #[test_case(
        "a_spec.rb[1:x]",
        ScopedIdParseErrorReason::InvalidComponent { component: "x".to_owned() } ;
        "letter"
    )]
    #[test_case(
        "a_spec.rb[+1]",
        ScopedIdParseErrorReason::InvalidComponent { component: "+1".to_owned() } ;
        "plus sign"
    )]
    #[test_case(
        "a_spec.rb[1:18446744073709551616]",
        ScopedIdParseErrorReason::ComponentOutOfRange {
            component: "18446744073709551616".to_owned(),
        } ;
        "above u64 max"
    )]
    #[test_case(
        "a_spec.rb[-1]",
        ScopedIdParseErrorReason::InvalidComponent { component: "-1".to_owned() } ;
        "negative"
    )]
    fn scoped_id_invalid(id: &str, reason: ScopedIdParseErrorReason) {
        let err = ExampleId::new(id)
            .scoped_id()
            .expect_err("invalid scoped id");
        assert_eq!(err.example_id(), id);
        assert_eq!(err.reason(), &reason);
        assert!(
            err.to_string()
                .starts_with("non-numeric scoped-id component"),
            "error message: {err}"
        );
    }

    #[test]
    fn scoped_id_ordering() {
        let parse = |id: &str| ExampleId::new(id).scoped_id().unwrap();
        assert!(parse("a[1:2]") < parse("a[1:10]"));
        assert!(parse("a[1]") < parse("a[1:1]"));
        assert!(parse("a[2]") > parse("a[1:99]"));
        assert_eq!(parse("a[1:2]").to_string(), "1:2");
    }

    #[test]
    fn record_equality_is_order_sensitive() {
        let a = ExampleStatusRecord::new()
            .with_field(EXAMPLE_ID_FIELD, "a[1]")
            .with_field(STATUS_FIELD, PASSED_STATUS);
        let b = ExampleStatusRecord::new()
            .with_field(STATUS_FIELD, PASSED_STATUS)
            .with_field(EXAMPLE_ID_FIELD, "a[1]");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.field_names().collect::<Vec<_>>(), [EXAMPLE_ID_FIELD, STATUS_FIELD]);
    }

    #[test]
    fn record_accessors() {
        let record = ExampleStatusRecord::from_fields([
            (EXAMPLE_ID_FIELD, "a[1]"),
            (STATUS_FIELD, UNKNOWN_STATUS),
            (RUN_TIME_FIELD, "0.01"),
        ]);
        assert_eq!(record.example_id(), Some("a[1]"));
        assert_eq!(record.status(), Some(UNKNOWN_STATUS));
        assert!(record.is_unknown());
        assert_eq!(record.get(RUN_TIME_FIELD), Some("0.01"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn record_json_preserves_order() {
        let record = ExampleStatusRecord::from_fields([
            (STATUS_FIELD, FAILED_STATUS),
            (EXAMPLE_ID_FIELD, "a[1]"),
        ]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"status":"failed","example_id":"a[1]"}"#);
        let back: ExampleStatusRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
