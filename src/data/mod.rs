pub mod snapshot;
pub mod store;
pub mod table;
pub mod validate;

pub use snapshot::Snapshot;
pub use store::{DatasetStore, LoadReport, StoreError, TableLoad, TableOutcome, DEFAULT_DATA_DIR};
pub use table::{
    parse_table, table_from_json, FlatTable, RawTable, TableError, TableKind, TableName, Value,
    YearTable,
};
pub use validate::{validate_snapshot, ValidationDiagnostic, ValidationReport, ValidationSeverity};
