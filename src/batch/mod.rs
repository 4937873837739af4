//! Batch materialization: every indicator over every (year, country) pair, written out per
//! indicator as soon as it completes.

pub mod output;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

use crate::data::{TableName, Value, YearTable};
use crate::indicators::graph::{check_order, GraphError, Indicator};
use crate::indicators::Evaluator;

pub use output::{OutputError, OutputFile, OutputWriter, DEFAULT_OUTPUT_DIR};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IndicatorSummary {
    pub indicator: Indicator,
    pub available: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub written: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generation: u64,
    pub started_at: String,
    pub finished_at: String,
    pub years: usize,
    pub countries: usize,
    pub indicators: Vec<IndicatorSummary>,
    pub write_errors: Vec<String>,
}

impl BatchReport {
    pub fn summary(&self, indicator: Indicator) -> Option<&IndicatorSummary> {
        self.indicators.iter().find(|s| s.indicator == indicator)
    }

    pub fn failed_cells(&self) -> usize {
        self.indicators.iter().map(|s| s.failed).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Materializer {
    order: Vec<Indicator>,
}

impl Default for Materializer {
    fn default() -> Self {
        Materializer {
            order: Indicator::BATCH_ORDER.to_vec(),
        }
    }
}

impl Materializer {
    /// Use a custom indicator order. Rejected unless every dependency precedes its dependents.
    pub fn with_order(order: Vec<Indicator>) -> Result<Self, GraphError> {
        check_order(&order)?;
        Ok(Materializer { order })
    }

    pub fn order(&self) -> &[Indicator] {
        &self.order
    }

    pub fn run(&self, ev: &mut Evaluator<'_>, output: &OutputWriter) -> BatchReport {
        self.run_with(ev, output, |ev, indicator, year, country| {
            ev.value(indicator, year, country)
        })
    }

    /// [Materializer::run] with the per-cell evaluation supplied by the caller.
    fn run_with<F>(&self, ev: &mut Evaluator<'_>, output: &OutputWriter, mut cell: F) -> BatchReport
    where
        F: FnMut(&mut Evaluator<'_>, Indicator, i32, &str) -> Value,
    {
        let started_at = chrono::Utc::now().to_rfc3339();
        let snap = ev.snapshot();
        let total = snap.year_table_untracked(TableName::Total);
        let years: Vec<i32> = total.keys().copied().collect();
        let countries: Vec<&String> = total
            .values()
            .next()
            .map(|row| row.keys().collect())
            .unwrap_or_default();

        tracing::info!(
            generation = snap.generation(),
            years = years.len(),
            countries = countries.len(),
            indicators = self.order.len(),
            "batch started"
        );

        let mut summaries = Vec::with_capacity(self.order.len());
        let mut write_errors = Vec::new();

        for &indicator in &self.order {
            let mut summary = IndicatorSummary {
                indicator,
                available: 0,
                unavailable: 0,
                failed: 0,
                written: false,
            };
            let mut table = YearTable::new();

            for &year in &years {
                let mut row = BTreeMap::new();
                for &country in &countries {
                    let value = match catch_unwind(AssertUnwindSafe(|| {
                        cell(&mut *ev, indicator, year, country)
                    })) {
                        Ok(value) => {
                            if value.is_some() {
                                summary.available += 1;
                            } else {
                                summary.unavailable += 1;
                            }
                            value
                        }
                        Err(payload) => {
                            tracing::error!(
                                indicator = %indicator,
                                year,
                                country = %country,
                                panic = panic_message(payload.as_ref()),
                                "indicator evaluation panicked"
                            );
                            summary.failed += 1;
                            None
                        }
                    };
                    row.insert(country.clone(), value);
                }
                table.insert(year, row);
            }

            match output.write_table(indicator.name(), &table) {
                Ok(path) => {
                    summary.written = true;
                    tracing::info!(
                        indicator = %indicator,
                        path = %path.display(),
                        available = summary.available,
                        unavailable = summary.unavailable,
                        failed = summary.failed,
                        "indicator written"
                    );
                }
                Err(err) => {
                    tracing::error!(indicator = %indicator, error = %err, "failed to write indicator");
                    write_errors.push(format!("{indicator}: {err}"));
                }
            }
            summaries.push(summary);
        }

        // Constants are persisted when first computed; rewrite them so each run leaves a full set.
        for (constant, value) in ev.cached_constants() {
            if let Err(err) = output.write_constant(constant.name(), value) {
                tracing::error!(constant = %constant, error = %err, "failed to write constant");
                write_errors.push(format!("{constant}: {err}"));
            }
        }

        let report = BatchReport {
            generation: snap.generation(),
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            years: years.len(),
            countries: countries.len(),
            indicators: summaries,
            write_errors,
        };
        tracing::info!(
            failed = report.failed_cells(),
            write_errors = report.write_errors.len(),
            "batch finished"
        );
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
