//! Persisted indicator outputs: one JSON file per indicator in the output directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::TimeZone;
use serde::Serialize;
use thiserror::Error;

use crate::data::{Value, YearTable};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("output file '{0}' not found")]
    NotFound(String),
    #[error("invalid output file name '{0}'; expected <name>.json")]
    InvalidName(String),
    #[error("'{path}' is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutputFile {
    pub filename: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

#[derive(Serialize)]
struct ConstantPayload {
    value: Value,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OutputWriter { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `{"value": <number-or-null>}` to `<name>.json`.
    pub fn write_constant(&self, name: &str, value: Value) -> Result<PathBuf, OutputError> {
        self.write_json(name, &ConstantPayload { value })
    }

    /// Write a full year -> country -> value table to `<name>.json`.
    pub fn write_table(&self, name: &str, table: &YearTable) -> Result<PathBuf, OutputError> {
        self.write_json(name, table)
    }

    /// Serialize then swap the file into place, so readers never see a half-written output.
    fn write_json<T: Serialize>(&self, name: &str, payload: &T) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(format!("{name}.json"));
        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        let write_err = |source| OutputError::Write {
            path: path.clone(),
            source,
        };

        let serialized = serde_json::to_string_pretty(payload)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        fs::write(&tmp, serialized).map_err(write_err)?;
        fs::rename(&tmp, &path).map_err(write_err)?;
        Ok(path)
    }

    /// Output files sorted by name. A missing output directory lists as empty.
    pub fn list(&self) -> Result<Vec<OutputFile>, OutputError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(OutputError::Read {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !is_output_name(&filename) {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .and_then(|d| {
                    chrono::Utc
                        .timestamp_opt(d.as_secs() as i64, d.subsec_nanos())
                        .single()
                        .map(|dt| dt.to_rfc3339())
                });
            files.push(OutputFile {
                filename,
                size: meta.len(),
                modified,
            });
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Read one persisted output by file name (`R_oa.json`).
    pub fn read(&self, filename: &str) -> Result<serde_json::Value, OutputError> {
        if !is_output_name(filename) {
            return Err(OutputError::InvalidName(filename.to_string()));
        }
        let path = self.dir.join(filename);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(OutputError::NotFound(filename.to_string()))
            }
            Err(source) => return Err(OutputError::Read { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| OutputError::Json { path, source })
    }
}

fn is_output_name(filename: &str) -> bool {
    filename.ends_with(".json")
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
        && !filename.contains("..")
}
