use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::data::snapshot::Snapshot;
use crate::data::table::{RawTable, TableName};

pub const REQUIRED_WEIGHTS: [&str; 3] = ["W_OA", "W_OD", "W_OP"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

/// Check the loaded tables for shape problems that would silently turn results unavailable.
pub fn validate_snapshot(snapshot: &Snapshot) -> ValidationReport {
    let mut report = ValidationReport::default();

    for name in TableName::ALL {
        match snapshot.raw(name) {
            Some(RawTable::Year(table)) => {
                if table.is_empty() {
                    report.push(ValidationSeverity::Warning, name.as_str(), "table is empty");
                    continue;
                }
                for (year, row) in table {
                    if !(1000..=9999).contains(year) {
                        report.push(
                            ValidationSeverity::Error,
                            name.as_str(),
                            format!("year key {year} is not a 4-digit year"),
                        );
                    }
                    let nulls = row.values().filter(|v| v.is_none()).count();
                    if nulls > 0 {
                        report.push(
                            ValidationSeverity::Info,
                            format!("{name}/{year}"),
                            format!("{nulls} unavailable value(s)"),
                        );
                    }
                }
            }
            Some(RawTable::Flat(table)) => {
                if name == TableName::Weight {
                    for key in REQUIRED_WEIGHTS {
                        if table.get(key).copied().flatten().is_none() {
                            report.push(
                                ValidationSeverity::Error,
                                name.as_str(),
                                format!("missing weight '{key}'"),
                            );
                        }
                    }
                }
            }
            None => report.push(ValidationSeverity::Warning, name.as_str(), "table not loaded"),
        }
    }

    check_batch_countries(snapshot, &mut report);
    report
}

/// The batch takes its country set from the earliest `total` year only; flag countries that
/// appear later and would be left out of the outputs.
fn check_batch_countries(snapshot: &Snapshot, report: &mut ValidationReport) {
    let Some(RawTable::Year(total)) = snapshot.raw(TableName::Total) else {
        return;
    };
    let Some((first_year, first_row)) = total.iter().next() else {
        return;
    };
    let batch_countries: BTreeSet<&str> = first_row.keys().map(String::as_str).collect();
    for (year, row) in total.iter().skip(1) {
        let extra: Vec<&str> = row
            .keys()
            .map(String::as_str)
            .filter(|c| !batch_countries.contains(c))
            .collect();
        if !extra.is_empty() {
            report.push(
                ValidationSeverity::Warning,
                format!("total/{year}"),
                format!(
                    "countries absent from {first_year} are excluded from batch output: {}",
                    extra.join(", ")
                ),
            );
        }
    }
}
