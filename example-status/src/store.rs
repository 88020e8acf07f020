// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage and retrieval of example statuses from previous runs.

use crate::{
    errors::{PersistError, StoreClearError, StoreLoadError, StoreSaveError},
    existence::SpecFileExists,
    merge::StatusMerger,
    record::{ExampleStatusRecord, FAILED_STATUS},
    table,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{collections::BTreeMap, fs, io::Write};
use tracing::debug;

/// Manages persistence of example statuses at a single path.
#[derive(Clone, Debug)]
pub struct StatusStore {
    /// Path to the status file.
    path: Utf8PathBuf,
}

impl StatusStore {
    /// Creates a new store backed by the file at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the status file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Loads the statuses from disk.
    ///
    /// A missing file is treated as an empty list.
    pub fn load(&self) -> Result<Vec<ExampleStatusRecord>, StoreLoadError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let records = table::decode(&contents);
                debug!(path = %self.path, count = records.len(), "loaded example statuses");
                Ok(records)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path, "no status file found");
                Ok(Vec::new())
            }
            Err(err) => Err(StoreLoadError::Read {
                path: self.path.clone(),
                error: err,
            }),
        }
    }

    /// Saves the statuses to disk, replacing the previous contents.
    ///
    /// An empty list produces an empty file.
    pub fn save(&self, records: &[ExampleStatusRecord]) -> Result<(), StoreSaveError> {
        // Ensure the parent directory exists
        if let Some(parent) = self.path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| StoreSaveError::CreateDir {
                path: parent.to_owned(),
                error: err,
            })?;
        }

        let contents = table::encode(records).unwrap_or_default();
        atomicwrites::AtomicFile::new(&self.path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(contents.as_bytes()))
            .map_err(|error| StoreSaveError::Write {
                path: self.path.clone(),
                error,
            })?;

        debug!(path = %self.path, count = records.len(), "saved example statuses");
        Ok(())
    }

    /// Merges this run's statuses with the stored ones and saves the result.
    ///
    /// Returns the merged list that was written.
    pub fn persist<E: SpecFileExists + ?Sized>(
        &self,
        this_run: Vec<ExampleStatusRecord>,
        spec_files: &E,
    ) -> Result<Vec<ExampleStatusRecord>, PersistError> {
        let from_previous = self.load()?;
        let merged = StatusMerger::new(spec_files)
            .merge(this_run, from_previous)
            .map_err(|error| PersistError::Merge {
                path: self.path.clone(),
                error,
            })?;
        self.save(&merged)?;
        Ok(merged)
    }

    /// Clears the stored statuses by removing the file.
    pub fn clear(&self) -> Result<(), StoreClearError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreClearError::Remove {
                path: self.path.clone(),
                error: err,
            }),
        }
    }
}

/// Returns the IDs of examples whose status is `failed`, in list order.
///
/// Run against a merged list, this is the set of examples to rerun when only
/// failures are wanted. The first entry is the next failure to work on.
pub fn failed_example_ids(records: &[ExampleStatusRecord]) -> Vec<&str> {
    records
        .iter()
        .filter(|record| record.status() == Some(FAILED_STATUS))
        .filter_map(|record| record.example_id())
        .collect()
}

/// Counts of examples by status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// Number of examples with each status.
    pub by_status: BTreeMap<String, usize>,

    /// Total number of examples.
    pub total: usize,
}

impl StatusSummary {
    /// Summarizes a list of records.
    ///
    /// Records without a status are counted in the total only.
    pub fn from_records(records: &[ExampleStatusRecord]) -> Self {
        let mut by_status = BTreeMap::new();
        for status in records.iter().filter_map(|record| record.status()) {
            *by_status.entry(status.to_owned()).or_default() += 1;
        }
        Self {
            by_status,
            total: records.len(),
        }
    }

    /// Returns the number of examples with the given status.
    pub fn count(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        EXAMPLE_ID_FIELD, PASSED_STATUS, PENDING_STATUS, STATUS_FIELD, UNKNOWN_STATUS,
    };
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn record(example_id: &str, status: &str) -> ExampleStatusRecord {
        ExampleStatusRecord::from_fields([(EXAMPLE_ID_FIELD, example_id), (STATUS_FIELD, status)])
    }

    #[test]
    fn test_store_lifecycle() {
        let temp_dir = Utf8TempDir::new().unwrap();
        let store = StatusStore::new(temp_dir.path().join("nested/dir/statuses.txt"));

        // Initially, there should be nothing stored
        assert!(store.load().unwrap().is_empty());

        let records = vec![
            record("a_spec.rb[1]", PASSED_STATUS),
            record("a_spec.rb[2]", FAILED_STATUS),
        ];
        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);

        // Saving an empty list leaves an empty file behind.
        store.save(&[]).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");
        assert!(store.load().unwrap().is_empty());

        // Clear and verify
        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_persist_merges_with_previous() {
        let temp_dir = Utf8TempDir::new().unwrap();
        let store = StatusStore::new(temp_dir.path().join("statuses.txt"));
        let spec_files = BTreeSet::from([Utf8PathBuf::from("b_spec.rb")]);

        store
            .persist(
                vec![
                    record("a_spec.rb[1]", FAILED_STATUS),
                    record("b_spec.rb[1]", FAILED_STATUS),
                ],
                &spec_files,
            )
            .unwrap();

        // Only a_spec.rb is loaded this time, and [1] wasn't executed.
        let merged = store
            .persist(vec![record("a_spec.rb[1]", UNKNOWN_STATUS)], &spec_files)
            .unwrap();
        assert_eq!(
            merged,
            vec![
                record("a_spec.rb[1]", FAILED_STATUS),
                record("b_spec.rb[1]", FAILED_STATUS),
            ]
        );
        assert_eq!(store.load().unwrap(), merged);
    }

    #[test]
    fn test_failed_example_ids_and_summary() {
        let records = vec![
            record("a_spec.rb[1]", PASSED_STATUS),
            record("a_spec.rb[2]", FAILED_STATUS),
            record("b_spec.rb[1]", PENDING_STATUS),
            record("b_spec.rb[2]", FAILED_STATUS),
        ];
        assert_eq!(failed_example_ids(&records), ["a_spec.rb[2]", "b_spec.rb[2]"]);

        let summary = StatusSummary::from_records(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(FAILED_STATUS), 2);
        assert_eq!(summary.count(PASSED_STATUS), 1);
        assert_eq!(summary.count(UNKNOWN_STATUS), 0);
    }
}
