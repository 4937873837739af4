//! Immutable view over one load of the raw tables.
//! Every lookup through the snapshot bumps a read counter so memoization can be observed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::data::table::{FlatTable, RawTable, TableKind, TableName, Value, YearTable};

static EMPTY_YEAR_TABLE: YearTable = BTreeMap::new();
static EMPTY_FLAT_TABLE: FlatTable = BTreeMap::new();

#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    tables: BTreeMap<TableName, RawTable>,
    reads: AtomicU64,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from parsed tables. Tables of the wrong kind for their name are dropped
    /// and read as empty.
    pub fn from_tables(
        generation: u64,
        tables: impl IntoIterator<Item = (TableName, RawTable)>,
    ) -> Self {
        let tables = tables
            .into_iter()
            .filter(|(name, table)| {
                matches!(
                    (name.kind(), table),
                    (TableKind::Year, RawTable::Year(_)) | (TableKind::Flat, RawTable::Flat(_))
                )
            })
            .collect();
        Snapshot {
            generation,
            tables,
            reads: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of raw-table lookups served so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// The table as loaded, without counting a read. Used by validation and reporting.
    pub fn raw(&self, name: TableName) -> Option<&RawTable> {
        self.tables.get(&name)
    }

    pub fn year_table(&self, name: TableName) -> &YearTable {
        self.touch();
        self.year_table_untracked(name)
    }

    /// [Snapshot::year_table] without counting a read. Used to enumerate batch domains.
    pub fn year_table_untracked(&self, name: TableName) -> &YearTable {
        match self.tables.get(&name) {
            Some(RawTable::Year(table)) => table,
            _ => &EMPTY_YEAR_TABLE,
        }
    }

    pub fn flat_table(&self, name: TableName) -> &FlatTable {
        self.touch();
        match self.tables.get(&name) {
            Some(RawTable::Flat(table)) => table,
            _ => &EMPTY_FLAT_TABLE,
        }
    }

    /// One cell; missing year, missing key and null all read as unavailable.
    pub fn get(&self, name: TableName, year: i32, key: &str) -> Value {
        self.year_table(name)
            .get(&year)
            .and_then(|row| row.get(key).copied())
            .flatten()
    }

    pub fn row(&self, name: TableName, year: i32) -> Option<&BTreeMap<String, Value>> {
        self.year_table(name).get(&year)
    }

    pub fn weight(&self, key: &str) -> Value {
        self.flat_table(TableName::Weight).get(key).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::table::table_from_json;

    fn snapshot() -> Snapshot {
        Snapshot::from_tables(
            3,
            [
                (
                    TableName::Oa,
                    table_from_json(&json!({"2020": {"CN": 10, "X": null}}), TableKind::Year)
                        .unwrap(),
                ),
                (
                    TableName::Weight,
                    table_from_json(&json!({"W_OA": 0.4}), TableKind::Flat).unwrap(),
                ),
                // wrong kind for the name; ignored
                (
                    TableName::Total,
                    table_from_json(&json!({"a": 1}), TableKind::Flat).unwrap(),
                ),
            ],
        )
    }

    #[test]
    fn lookups_degrade_to_unavailable() {
        let snap = snapshot();
        assert_eq!(snap.get(TableName::Oa, 2020, "CN"), Some(10.0));
        assert_eq!(snap.get(TableName::Oa, 2020, "X"), None);
        assert_eq!(snap.get(TableName::Oa, 2020, "ZZ"), None);
        assert_eq!(snap.get(TableName::Oa, 1999, "CN"), None);
        assert_eq!(snap.get(TableName::F3, 2020, "CN"), None);
        assert!(snap.year_table(TableName::Total).is_empty());
        assert_eq!(snap.weight("W_OA"), Some(0.4));
        assert_eq!(snap.weight("W_OD"), None);
    }

    #[test]
    fn reads_are_counted() {
        let snap = snapshot();
        assert_eq!(snap.reads(), 0);
        let _ = snap.get(TableName::Oa, 2020, "CN");
        let _ = snap.weight("W_OA");
        assert_eq!(snap.reads(), 2);
        let _ = snap.raw(TableName::Oa);
        assert_eq!(snap.reads(), 2);
        assert_eq!(snap.generation(), 3);
    }
}
