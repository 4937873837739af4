#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

/// One year (2020), three countries. `X` has no open-access count.
pub fn fixture_tables() -> Vec<(&'static str, Value)> {
    vec![
        ("total", json!({"2020": {"CN": 100, "US": 200, "X": 50}})),
        ("OA", json!({"2020": {"CN": 40, "US": 50, "X": null}})),
        ("cooperation", json!({"2020": {"CN": 20, "US": 60, "X": 10}})),
        ("OP", json!({"2020": {"CN": 3, "US": 6, "X": 2}})),
        ("FWCI", json!({"2010": {"CN": 1.3}, "2020": {"CN": 1.0, "US": 1.2, "X": 0.8}})),
        ("scientist", json!({"2010": {"CN": 4, "US": 9}, "2020": {"CN": 10, "US": 20, "X": 5}})),
        (
            "world_total",
            json!({
                "2010": {"world_oa_total": null, "world_scientist": 50},
                "2020": {"world_oa_total": 1000, "world_scientist": 100}
            }),
        ),
        ("alpha_L", json!({"2010": {"CN": 0.9, "US": 0.9, "X": 0.9}, "2020": {"CN": 0.9, "US": 0.9, "X": 0.9}})),
        ("alpha_F", json!({"2020": {"CN": 0.5, "US": 0.5, "X": 0.5}})),
        ("alpha_I", json!({"2020": {"CN": 0.7, "US": 0.7, "X": 0.7}})),
        ("F2", json!({"2020": {"CN": 2, "US": 3, "X": 1}})),
        ("F3", json!({"2020": {"CN": 0.5, "US": 0.6, "X": 0.4}})),
        ("retraction", json!({"2020": {"CN": 1, "US": 2, "X": 0}})),
        ("weight", json!({"W_OA": 0.4, "W_OD": 0.4, "W_OP": 0.2})),
    ]
}

pub fn write_tables(dir: &Path, tables: &[(&str, Value)]) {
    fs::create_dir_all(dir).expect("data dir should be creatable");
    for (name, table) in tables {
        let raw = serde_json::to_string_pretty(table).expect("fixture should serialize");
        fs::write(dir.join(format!("{name}.json")), raw).expect("fixture should be writable");
    }
}

pub fn write_fixture(dir: &Path) {
    write_tables(dir, &fixture_tables());
}

pub fn approx_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}
