// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging this run's example statuses with those from previous runs.
//!
//! The merged list is what gets persisted. It contains:
//!
//! - every example seen this run, with its status from this run, unless it was
//!   loaded but not executed (status `unknown`) and a previous status is known;
//! - every example from previous runs that may still exist. An example provably
//!   no longer exists if its spec file was loaded this run but the example was
//!   not, or if its spec file has been deleted.

use crate::{
    errors::{MergeError, MergeListKind, ScopedIdParseError},
    existence::{ExistenceCache, SpecFileExists},
    record::{ExampleId, ExampleStatusRecord, ScopedId},
};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Merges example status lists across runs.
#[derive(Debug)]
pub struct StatusMerger<'e, E: ?Sized> {
    spec_files: &'e E,
}

impl<'e, E: SpecFileExists + ?Sized> StatusMerger<'e, E> {
    /// Creates a new merger which uses `spec_files` to check whether spec files
    /// that weren't loaded this run still exist.
    pub fn new(spec_files: &'e E) -> Self {
        Self { spec_files }
    }

    /// Merges `this_run` with `from_previous`, returning the sorted result.
    ///
    /// Each spec file is checked for existence at most once per call.
    pub fn merge(
        &self,
        this_run: Vec<ExampleStatusRecord>,
        from_previous: Vec<ExampleStatusRecord>,
    ) -> Result<Vec<ExampleStatusRecord>, MergeError> {
        let this_run = index_by_example_id(this_run, MergeListKind::ThisRun)?;
        let mut from_previous = index_by_example_id(from_previous, MergeListKind::Previous)?;

        let mut stats = MergeStats::default();
        self.prune_missing_examples(&this_run, &mut from_previous, &mut stats)?;

        let mut merged = Vec::with_capacity(this_run.len() + from_previous.len());
        for (example_id, this_record) in this_run {
            match from_previous.shift_remove(&example_id) {
                // Loaded but not executed: the previous outcome still stands.
                Some(prev_record) if this_record.is_unknown() => {
                    stats.kept_previous += 1;
                    merged.push(prev_record);
                }
                Some(_) => {
                    stats.replaced += 1;
                    merged.push(this_record);
                }
                None => merged.push(this_record),
            }
        }
        stats.carried_forward = from_previous.len();
        merged.extend(from_previous.into_values());

        debug!(
            merged = merged.len(),
            pruned = stats.pruned,
            replaced = stats.replaced,
            kept_previous = stats.kept_previous,
            carried_forward = stats.carried_forward,
            "merged example statuses"
        );

        Ok(sort_records(merged)?)
    }

    fn prune_missing_examples(
        &self,
        this_run: &IndexMap<String, ExampleStatusRecord>,
        from_previous: &mut IndexMap<String, ExampleStatusRecord>,
        stats: &mut MergeStats,
    ) -> Result<(), MergeError> {
        // this_run includes examples that were loaded but not executed, so
        // every spec file here was fully loaded.
        let loaded_spec_files: HashSet<&str> = this_run
            .keys()
            .map(|id| ExampleId::new(id).spec_file())
            .collect();
        let mut cache = ExistenceCache::new(self.spec_files);

        let mut to_remove = Vec::new();
        for example_id in from_previous.keys() {
            if this_run.contains_key(example_id) {
                continue;
            }
            let spec_file = ExampleId::new(example_id).spec_file();
            if loaded_spec_files.contains(spec_file) || !cache.exists(spec_file)? {
                to_remove.push(example_id.clone());
            }
        }

        stats.pruned = to_remove.len();
        for example_id in to_remove {
            from_previous.shift_remove(&example_id);
        }
        Ok(())
    }
}

/// Merges `this_run` with `from_previous` using `spec_files` for existence
/// checks.
///
/// This is a shortcut for [`StatusMerger::merge`].
pub fn merge<E: SpecFileExists + ?Sized>(
    this_run: Vec<ExampleStatusRecord>,
    from_previous: Vec<ExampleStatusRecord>,
    spec_files: &E,
) -> Result<Vec<ExampleStatusRecord>, MergeError> {
    StatusMerger::new(spec_files).merge(this_run, from_previous)
}

/// Sorts records by spec file, then numerically by scoped ID.
///
/// A record without an `example_id` sorts as if its ID were empty.
pub fn sort_records(
    records: Vec<ExampleStatusRecord>,
) -> Result<Vec<ExampleStatusRecord>, ScopedIdParseError> {
    let mut keyed = records
        .into_iter()
        .map(|record| {
            let example_id = ExampleId::new(record.example_id().unwrap_or_default());
            let key = (example_id.spec_file().to_owned(), example_id.scoped_id()?);
            Ok((key, record))
        })
        .collect::<Result<Vec<((String, ScopedId), _)>, ScopedIdParseError>>()?;

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

fn index_by_example_id(
    records: Vec<ExampleStatusRecord>,
    list: MergeListKind,
) -> Result<IndexMap<String, ExampleStatusRecord>, MergeError> {
    let mut map = IndexMap::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let Some(example_id) = record.example_id() else {
            return Err(MergeError::MissingExampleId { list, index });
        };
        // Duplicates are a caller error; the last one wins.
        map.insert(example_id.to_owned(), record);
    }
    Ok(map)
}

#[derive(Debug, Default)]
struct MergeStats {
    pruned: usize,
    replaced: usize,
    kept_previous: usize,
    carried_forward: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        EXAMPLE_ID_FIELD, FAILED_STATUS, PASSED_STATUS, PENDING_STATUS, RUN_TIME_FIELD,
        STATUS_FIELD, UNKNOWN_STATUS,
    };
    use camino::{Utf8Path, Utf8PathBuf};
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::{cell::RefCell, collections::BTreeSet, io};
    use test_strategy::proptest;

    fn record(example_id: &str, status: &str) -> ExampleStatusRecord {
        ExampleStatusRecord::new()
            .with_field(EXAMPLE_ID_FIELD, example_id)
            .with_field(STATUS_FIELD, status)
    }

    fn ids(records: &[ExampleStatusRecord]) -> Vec<&str> {
        records.iter().map(|r| r.example_id().unwrap()).collect()
    }

    fn no_files() -> BTreeSet<Utf8PathBuf> {
        BTreeSet::new()
    }

    #[test]
    fn unknown_status_keeps_previous_outcome() {
        let merged = merge(
            vec![record("a_spec.rb[1]", UNKNOWN_STATUS)],
            vec![record("a_spec.rb[1]", FAILED_STATUS)],
            &no_files(),
        )
        .unwrap();
        assert_eq!(merged, vec![record("a_spec.rb[1]", FAILED_STATUS)]);
    }

    #[test]
    fn this_run_outcome_replaces_previous() {
        let this_run = vec![
            record("a_spec.rb[1]", PASSED_STATUS).with_field(RUN_TIME_FIELD, "0.1"),
            record("a_spec.rb[2]", UNKNOWN_STATUS).with_field(RUN_TIME_FIELD, ""),
        ];
        let previous = vec![
            record("a_spec.rb[1]", FAILED_STATUS).with_field(RUN_TIME_FIELD, "0.5"),
            record("a_spec.rb[2]", PENDING_STATUS).with_field(RUN_TIME_FIELD, "0.2"),
        ];
        let merged = merge(this_run, previous, &no_files()).unwrap();
        assert_eq!(
            merged,
            vec![
                record("a_spec.rb[1]", PASSED_STATUS).with_field(RUN_TIME_FIELD, "0.1"),
                record("a_spec.rb[2]", PENDING_STATUS).with_field(RUN_TIME_FIELD, "0.2"),
            ]
        );
    }

    #[test]
    fn unknown_without_previous_is_kept() {
        let merged = merge(vec![record("a_spec.rb[1]", UNKNOWN_STATUS)], vec![], &no_files())
            .unwrap();
        assert_eq!(merged, vec![record("a_spec.rb[1]", UNKNOWN_STATUS)]);
    }

    #[test]
    fn prunes_missing_id_from_loaded_file() {
        // a_spec.rb exists on disk, but it was loaded this run and [2] wasn't
        // in it.
        let files = BTreeSet::from([Utf8PathBuf::from("a_spec.rb")]);
        let merged = merge(
            vec![record("a_spec.rb[1]", PASSED_STATUS)],
            vec![
                record("a_spec.rb[1]", FAILED_STATUS),
                record("a_spec.rb[2]", FAILED_STATUS),
            ],
            &files,
        )
        .unwrap();
        assert_eq!(ids(&merged), ["a_spec.rb[1]"]);
    }

    #[test]
    fn prunes_unloaded_deleted_file_and_retains_existing_file() {
        let temp_dir = Utf8TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("spec")).unwrap();
        std::fs::write(temp_dir.path().join("spec/h_spec.rb"), "").unwrap();
        let files = crate::FilesystemSpecFiles::with_root(temp_dir.path());

        let kept = record("spec/h_spec.rb[1:1]", FAILED_STATUS).with_field(RUN_TIME_FIELD, "1");
        let merged = merge(
            vec![record("spec/f_spec.rb[1]", PASSED_STATUS)],
            vec![
                record("spec/g_spec.rb[1]", FAILED_STATUS),
                kept.clone(),
            ],
            &files,
        )
        .unwrap();

        assert_eq!(
            merged,
            vec![record("spec/f_spec.rb[1]", PASSED_STATUS), kept]
        );
    }

    #[test]
    fn sorts_numerically_by_scoped_id() {
        let merged = merge(
            vec![
                record("b_spec.rb[1:1]", PASSED_STATUS),
                record("a_spec.rb[1:10]", PASSED_STATUS),
                record("a_spec.rb[1:2]", PASSED_STATUS),
                record("a_spec.rb[1]", PASSED_STATUS),
            ],
            vec![],
            &no_files(),
        )
        .unwrap();
        assert_eq!(
            ids(&merged),
            ["a_spec.rb[1]", "a_spec.rb[1:2]", "a_spec.rb[1:10]", "b_spec.rb[1:1]"]
        );
    }

    #[test]
    fn empty_inputs() {
        assert!(merge(vec![], vec![], &no_files()).unwrap().is_empty());

        let files = BTreeSet::from([Utf8PathBuf::from("a_spec.rb")]);
        let previous = vec![record("a_spec.rb[1]", FAILED_STATUS)];
        assert_eq!(merge(vec![], previous.clone(), &files).unwrap(), previous);
    }

    #[test]
    fn existence_checked_once_per_spec_file() {
        struct Counting(RefCell<Vec<Utf8PathBuf>>);

        impl SpecFileExists for Counting {
            fn spec_file_exists(&self, path: &Utf8Path) -> io::Result<bool> {
                self.0.borrow_mut().push(path.to_owned());
                Ok(true)
            }
        }

        let counting = Counting(RefCell::new(Vec::new()));
        let merged = StatusMerger::new(&counting)
            .merge(
                vec![],
                vec![
                    record("a_spec.rb[1]", FAILED_STATUS),
                    record("a_spec.rb[2]", FAILED_STATUS),
                    record("b_spec.rb[1]", PASSED_STATUS),
                    record("a_spec.rb[3]", PASSED_STATUS),
                ],
            )
            .unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(
            *counting.0.borrow(),
            [Utf8PathBuf::from("a_spec.rb"), Utf8PathBuf::from("b_spec.rb")]
        );
    }

    #[test]
    fn existence_errors_propagate() {
        struct Denied;

        impl SpecFileExists for Denied {
            fn spec_file_exists(&self, _path: &Utf8Path) -> io::Result<bool> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            }
        }

        let err = merge(vec![], vec![record("a_spec.rb[1]", FAILED_STATUS)], &Denied)
            .unwrap_err();
        assert!(
            matches!(err, MergeError::SpecFileExists { ref path, .. } if *path == "a_spec.rb"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn malformed_scoped_id_fails() {
        let err = merge(vec![record("a_spec.rb[1:x]", PASSED_STATUS)], vec![], &no_files())
            .unwrap_err();
        match err {
            MergeError::ScopedId(error) => assert_eq!(error.example_id(), "a_spec.rb[1:x]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_example_id_fails() {
        let err = merge(
            vec![record("a_spec.rb[1]", PASSED_STATUS)],
            vec![ExampleStatusRecord::new().with_field(STATUS_FIELD, PASSED_STATUS)],
            &no_files(),
        )
        .unwrap_err();
        assert!(
            matches!(
                err,
                MergeError::MissingExampleId {
                    list: MergeListKind::Previous,
                    index: 0
                }
            ),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn duplicate_ids_last_wins() {
        let merged = merge(
            vec![
                record("a_spec.rb[1]", FAILED_STATUS),
                record("a_spec.rb[1]", PASSED_STATUS),
            ],
            vec![],
            &no_files(),
        )
        .unwrap();
        assert_eq!(merged, vec![record("a_spec.rb[1]", PASSED_STATUS)]);
    }

    // ---
    // Properties
    // ---

    fn arb_records() -> impl Strategy<Value = Vec<ExampleStatusRecord>> {
        prop::collection::btree_map(
            (0..4usize, prop::collection::vec(0..20u64, 1..4)),
            prop::sample::select(vec![PASSED_STATUS, FAILED_STATUS, PENDING_STATUS]),
            0..24,
        )
        .prop_map(|examples| {
            examples
                .into_iter()
                .map(|((file, scoped), status)| {
                    let scoped = scoped
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(":");
                    record(&format!("spec/{file}_spec.rb[{scoped}]"), status)
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
    }

    /// Merging a list with itself is the same as sorting it.
    #[proptest(cases = 64)]
    fn merge_with_self_is_sort(#[strategy(arb_records())] records: Vec<ExampleStatusRecord>) {
        let merged = merge(records.clone(), records.clone(), &no_files()).unwrap();
        prop_assert_eq!(merged, sort_records(records).unwrap());
    }

    /// The output order doesn't depend on the input order.
    #[proptest(cases = 64)]
    fn merge_output_is_sorted(#[strategy(arb_records())] records: Vec<ExampleStatusRecord>) {
        let merged = merge(records.clone(), vec![], &no_files()).unwrap();
        let keys: Vec<_> = merged
            .iter()
            .map(|r| {
                let id = ExampleId::new(r.example_id().unwrap());
                (id.spec_file().to_owned(), id.scoped_id().unwrap())
            })
            .collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(merged.len(), records.len());
    }
}
