//! Dataset store: loads every named raw table from the data directory into a fresh snapshot.
//! Missing or malformed files never fail a load; they degrade to empty tables (after trying the
//! `.json.bak` sibling) and are reported per table.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;
use thiserror::Error;

use crate::data::snapshot::Snapshot;
use crate::data::table::{table_from_json, RawTable, TableError, TableName};

pub const DEFAULT_DATA_DIR: &str = "jsondata";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data directory '{0}' does not exist or is not a directory")]
    DataDirMissing(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    Loaded,
    Missing,
    RecoveredFromBackup { repaired: bool },
    Degraded { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TableLoad {
    pub table: TableName,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub generation: u64,
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    pub fn outcome(&self, name: TableName) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|t| t.table == name)
            .map(|t| &t.outcome)
    }

    /// Tables that did not load cleanly from their primary file.
    pub fn problem_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.outcome != TableOutcome::Loaded)
            .count()
    }
}

#[derive(Debug)]
pub struct DatasetStore {
    data_dir: PathBuf,
    repair_from_backup: bool,
    generation: u64,
    snapshot: Arc<Snapshot>,
}

impl DatasetStore {
    /// Create a store over `data_dir`. Nothing is read until [DatasetStore::load].
    pub fn open(data_dir: impl Into<PathBuf>, repair_from_backup: bool) -> Self {
        DatasetStore {
            data_dir: data_dir.into(),
            repair_from_backup,
            generation: 0,
            snapshot: Arc::new(Snapshot::empty()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Read every table into a new snapshot and swap it in once complete.
    /// On error the previous snapshot stays current.
    pub fn load(&mut self) -> Result<LoadReport, StoreError> {
        if !self.data_dir.is_dir() {
            tracing::error!(data_dir = %self.data_dir.display(), "data directory missing");
            return Err(StoreError::DataDirMissing(self.data_dir.clone()));
        }

        let generation = self.generation + 1;
        let mut tables = Vec::with_capacity(TableName::ALL.len());
        let mut loads = Vec::with_capacity(TableName::ALL.len());
        for name in TableName::ALL {
            let (table, outcome) = load_table(&self.data_dir, name, self.repair_from_backup);
            tables.push((name, table));
            loads.push(TableLoad {
                table: name,
                outcome,
            });
        }

        self.snapshot = Arc::new(Snapshot::from_tables(generation, tables));
        self.generation = generation;

        let report = LoadReport {
            generation,
            tables: loads,
        };
        tracing::info!(
            generation,
            problems = report.problem_count(),
            "dataset store loaded"
        );
        Ok(report)
    }
}

fn load_table(dir: &Path, name: TableName, repair: bool) -> (RawTable, TableOutcome) {
    let path = dir.join(name.file_name());
    let empty = RawTable::empty(name.kind());

    if !path.exists() {
        tracing::warn!(table = %name, path = %path.display(), "table file missing; using empty table");
        return (empty, TableOutcome::Missing);
    }

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(table = %name, path = %path.display(), error = %err, "failed to read table");
            return (
                empty,
                TableOutcome::Degraded {
                    reason: err.to_string(),
                },
            );
        }
    };

    let primary_err = match parse_json(&raw).and_then(|json| table_from_json(&json, name.kind())) {
        Ok(table) => return (table, TableOutcome::Loaded),
        Err(err) => err,
    };

    let backup = dir.join(name.backup_file_name());
    if !backup.exists() {
        tracing::error!(table = %name, error = %primary_err, "malformed table and no backup; using empty table");
        return (
            empty,
            TableOutcome::Degraded {
                reason: primary_err.to_string(),
            },
        );
    }

    tracing::warn!(table = %name, error = %primary_err, "malformed table; recovering from backup");
    let recovered = fs::read_to_string(&backup)
        .map_err(|e| TableError::Json(e.to_string()))
        .and_then(|raw| parse_json(&raw))
        .and_then(|json| table_from_json(&json, name.kind()).map(|table| (json, table)));

    match recovered {
        Ok((json, table)) => {
            let repaired = repair && rewrite_primary(&path, &json);
            (table, TableOutcome::RecoveredFromBackup { repaired })
        }
        Err(err) => {
            tracing::error!(table = %name, error = %err, "backup recovery failed; using empty table");
            (
                empty,
                TableOutcome::Degraded {
                    reason: format!("{primary_err}; backup: {err}"),
                },
            )
        }
    }
}

fn parse_json(raw: &str) -> Result<Json, TableError> {
    serde_json::from_str(raw).map_err(|e| TableError::Json(e.to_string()))
}

fn rewrite_primary(path: &Path, json: &Json) -> bool {
    let written = serde_json::to_string_pretty(json)
        .map_err(std::io::Error::other)
        .and_then(|payload| fs::write(path, payload));
    match written {
        Ok(()) => {
            tracing::info!(path = %path.display(), "primary table rewritten from backup");
            true
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "recovered from backup but could not rewrite primary");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, file: &str, contents: &str) {
        fs::write(dir.join(file), contents).expect("fixture should be written");
    }

    #[test]
    fn missing_files_load_as_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "OA.json", r#"{"2020": {"CN": 5}}"#);

        let mut store = DatasetStore::open(dir.path(), false);
        let report = store.load().unwrap();

        assert_eq!(report.generation, 1);
        assert_eq!(report.outcome(TableName::Oa), Some(&TableOutcome::Loaded));
        assert_eq!(report.outcome(TableName::Total), Some(&TableOutcome::Missing));
        let snap = store.snapshot();
        assert_eq!(snap.get(TableName::Oa, 2020, "CN"), Some(5.0));
        assert!(snap.year_table(TableName::Total).is_empty());
    }

    #[test]
    fn malformed_table_recovers_from_backup_and_repairs_primary() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "OA.json", r#"{"2020": {"CN": "#);
        write(dir.path(), "OA.json.bak", r#"{"2020": {"CN": 7}}"#);

        let mut store = DatasetStore::open(dir.path(), true);
        let report = store.load().unwrap();

        assert_eq!(
            report.outcome(TableName::Oa),
            Some(&TableOutcome::RecoveredFromBackup { repaired: true })
        );
        assert_eq!(store.snapshot().get(TableName::Oa, 2020, "CN"), Some(7.0));
        let rewritten = fs::read_to_string(dir.path().join("OA.json")).unwrap();
        let json: Json = serde_json::from_str(&rewritten).unwrap();
        assert_eq!(json["2020"]["CN"], 7);
    }

    #[test]
    fn recovery_without_repair_leaves_primary_untouched() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "total.json", "not json");
        write(dir.path(), "total.json.bak", r#"{"2020": {"CN": 1}}"#);

        let mut store = DatasetStore::open(dir.path(), false);
        let report = store.load().unwrap();

        assert_eq!(
            report.outcome(TableName::Total),
            Some(&TableOutcome::RecoveredFromBackup { repaired: false })
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("total.json")).unwrap(),
            "not json"
        );
    }

    #[test]
    fn malformed_table_without_usable_backup_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "OA.json", "{");
        write(dir.path(), "F2.json", "{");
        write(dir.path(), "F2.json.bak", "also broken");

        let mut store = DatasetStore::open(dir.path(), true);
        let report = store.load().unwrap();

        assert!(matches!(
            report.outcome(TableName::Oa),
            Some(TableOutcome::Degraded { .. })
        ));
        assert!(matches!(
            report.outcome(TableName::F2),
            Some(TableOutcome::Degraded { .. })
        ));
        assert!(store.snapshot().year_table(TableName::Oa).is_empty());
    }

    #[test]
    fn missing_data_dir_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "OA.json", r#"{"2020": {"CN": 5}}"#);
        let mut store = DatasetStore::open(dir.path(), false);
        store.load().unwrap();
        let before = store.snapshot();

        let gone = dir.path().join("nope");
        let mut other = DatasetStore::open(&gone, false);
        assert!(matches!(other.load(), Err(StoreError::DataDirMissing(_))));
        assert_eq!(other.generation(), 0);

        store.load().unwrap();
        assert_eq!(store.generation(), 2);
        assert!(!Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(before.generation(), 1);
    }

    #[test]
    fn load_report_serializes_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DatasetStore::open(dir.path(), false);
        let report = store.load().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["generation"], 1);
        assert_eq!(json["tables"][0]["table"], "alpha_F");
        assert_eq!(json["tables"][0]["outcome"], "missing");
    }
}
