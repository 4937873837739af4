//! Raw table shapes and the fixed set of named tables read from the data directory.
//! Year tables map year -> key -> number-or-null; the weight table is a flat name -> number map.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value as Json;
use thiserror::Error;

/// A single raw or derived number. `None` means "unavailable".
pub type Value = Option<f64>;

/// year -> (country or scalar name) -> value. Years iterate in ascending order.
pub type YearTable = BTreeMap<i32, BTreeMap<String, Value>>;

/// name -> value, used for the blend weights.
pub type FlatTable = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableName {
    AlphaF,
    Cooperation,
    Oa,
    AlphaI,
    F2,
    Op,
    AlphaL,
    Fwci,
    Retraction,
    Scientist,
    Total,
    WorldTotal,
    Weight,
    F3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// year -> country -> value (also year -> scalar name -> value for `world_total`).
    Year,
    Flat,
}

impl TableName {
    pub const ALL: [TableName; 14] = [
        TableName::AlphaF,
        TableName::Cooperation,
        TableName::Oa,
        TableName::AlphaI,
        TableName::F2,
        TableName::Op,
        TableName::AlphaL,
        TableName::Fwci,
        TableName::Retraction,
        TableName::Scientist,
        TableName::Total,
        TableName::WorldTotal,
        TableName::Weight,
        TableName::F3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlphaF => "alpha_F",
            Self::Cooperation => "cooperation",
            Self::Oa => "OA",
            Self::AlphaI => "alpha_I",
            Self::F2 => "F2",
            Self::Op => "OP",
            Self::AlphaL => "alpha_L",
            Self::Fwci => "FWCI",
            Self::Retraction => "retraction",
            Self::Scientist => "scientist",
            Self::Total => "total",
            Self::WorldTotal => "world_total",
            Self::Weight => "weight",
            Self::F3 => "F3",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    pub fn backup_file_name(&self) -> String {
        format!("{}.json.bak", self.as_str())
    }

    pub fn kind(&self) -> TableKind {
        match self {
            Self::Weight => TableKind::Flat,
            _ => TableKind::Year,
        }
    }

    pub fn from_name(name: &str) -> Option<TableName> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl Serialize for TableName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table parsed into the shape its name calls for.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTable {
    Year(YearTable),
    Flat(FlatTable),
}

impl RawTable {
    pub fn empty(kind: TableKind) -> Self {
        match kind {
            TableKind::Year => RawTable::Year(YearTable::new()),
            TableKind::Flat => RawTable::Flat(FlatTable::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawTable::Year(t) => t.is_empty(),
            RawTable::Flat(t) => t.is_empty(),
        }
    }
}

/// Shape problems that make a table unusable as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("expected a JSON object at the top level")]
    NotAnObject,
    #[error("year key '{0}' is not an integer")]
    BadYearKey(String),
    #[error("entry for year '{0}' is not a JSON object")]
    BadYearEntry(String),
}

/// Parse raw file contents into the shape required by `kind`.
pub fn parse_table(raw: &str, kind: TableKind) -> Result<RawTable, TableError> {
    let json: Json = serde_json::from_str(raw).map_err(|e| TableError::Json(e.to_string()))?;
    table_from_json(&json, kind)
}

pub fn table_from_json(json: &Json, kind: TableKind) -> Result<RawTable, TableError> {
    let Json::Object(top) = json else {
        return Err(TableError::NotAnObject);
    };
    match kind {
        TableKind::Flat => Ok(RawTable::Flat(
            top.iter().map(|(k, v)| (k.clone(), number(v))).collect(),
        )),
        TableKind::Year => {
            let mut table = YearTable::new();
            for (year_key, entry) in top {
                let year = parse_year(year_key)
                    .ok_or_else(|| TableError::BadYearKey(year_key.clone()))?;
                let Json::Object(cells) = entry else {
                    return Err(TableError::BadYearEntry(year_key.clone()));
                };
                let row = cells.iter().map(|(k, v)| (k.clone(), number(v))).collect();
                table.insert(year, row);
            }
            Ok(RawTable::Year(table))
        }
    }
}

/// Exactly four ASCII digits. Padded or signed spellings would collide with the canonical key.
fn parse_year(key: &str) -> Option<i32> {
    if key.len() != 4 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// Numbers are values; null and anything non-numeric are unavailable.
fn number(value: &Json) -> Value {
    value.as_f64().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_table_parses_nulls_and_orders_years() {
        let raw = r#"{"2021": {"CN": 3, "US": null}, "2019": {"CN": 1.5}}"#;
        let RawTable::Year(table) = parse_table(raw, TableKind::Year).unwrap() else {
            panic!("expected a year table");
        };
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![2019, 2021]);
        assert_eq!(table[&2021]["CN"], Some(3.0));
        assert_eq!(table[&2021]["US"], None);
    }

    #[test]
    fn non_numeric_cells_are_unavailable() {
        let raw = r#"{"2020": {"CN": "n/a", "US": true}}"#;
        let RawTable::Year(table) = parse_table(raw, TableKind::Year).unwrap() else {
            panic!("expected a year table");
        };
        assert_eq!(table[&2020]["CN"], None);
        assert_eq!(table[&2020]["US"], None);
    }

    #[test]
    fn bad_shapes_are_rejected() {
        assert_eq!(
            parse_table("[1, 2]", TableKind::Year),
            Err(TableError::NotAnObject)
        );
        assert_eq!(
            parse_table(r#"{"latest": {}}"#, TableKind::Year),
            Err(TableError::BadYearKey("latest".to_string()))
        );
        assert_eq!(
            parse_table(r#"{"2020": 4}"#, TableKind::Year),
            Err(TableError::BadYearEntry("2020".to_string()))
        );
        assert!(matches!(
            parse_table("{\"2020\": ", TableKind::Year),
            Err(TableError::Json(_))
        ));
    }

    #[test]
    fn year_keys_must_be_exactly_four_digits() {
        for key in [" 2020", "02020", "+2020", "20201", "202"] {
            let raw = format!(r#"{{"2020": {{"CN": 1}}, "{key}": {{"CN": 2}}}}"#);
            assert_eq!(
                parse_table(&raw, TableKind::Year),
                Err(TableError::BadYearKey(key.to_string())),
                "key {key:?}"
            );
        }
    }

    #[test]
    fn flat_table_reads_weights() {
        let raw = r#"{"W_OA": 0.4, "W_OD": 0.3, "W_OP": 0.3}"#;
        let RawTable::Flat(table) = parse_table(raw, TableKind::Flat).unwrap() else {
            panic!("expected a flat table");
        };
        assert_eq!(table["W_OA"], Some(0.4));
    }

    #[test]
    fn table_names_round_trip_through_file_names() {
        for name in TableName::ALL {
            assert_eq!(TableName::from_name(name.as_str()), Some(name));
            assert!(name.file_name().ends_with(".json"));
        }
        assert_eq!(TableName::Weight.kind(), TableKind::Flat);
        assert_eq!(TableName::WorldTotal.kind(), TableKind::Year);
    }
}
