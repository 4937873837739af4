//! Memoized evaluation over one dataset generation.

use std::sync::Arc;

use crate::batch::output::OutputWriter;
use crate::data::{Snapshot, Value};
use crate::indicators::cache::ResultCache;
use crate::indicators::graph::{Constant, Indicator};
use crate::indicators::{constants, formulas};

/// One dataset snapshot and the results computed from it. A reload builds a new generation
/// instead of clearing this one.
#[derive(Debug)]
pub struct Generation {
    snapshot: Arc<Snapshot>,
    cache: ResultCache,
}

impl Generation {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Generation {
            snapshot,
            cache: ResultCache::new(),
        }
    }

    pub fn number(&self) -> u64 {
        self.snapshot.generation()
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    pub fn evaluator(&mut self) -> Evaluator<'_> {
        Evaluator {
            snapshot: &self.snapshot,
            cache: &mut self.cache,
            output: None,
        }
    }
}

/// Check cache, compute, store. Constants are also written out the first time they are computed
/// when an output writer is attached.
pub struct Evaluator<'a> {
    snapshot: &'a Snapshot,
    cache: &'a mut ResultCache,
    output: Option<&'a OutputWriter>,
}

impl<'a> Evaluator<'a> {
    pub fn with_output(mut self, output: &'a OutputWriter) -> Self {
        self.output = Some(output);
        self
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    pub fn cached_constants(&self) -> Vec<(Constant, Value)> {
        self.cache.constants()
    }

    pub fn value(&mut self, indicator: Indicator, year: i32, country: &str) -> Value {
        if let Some(hit) = self.cache.get(indicator, year, country) {
            return hit;
        }
        let value = formulas::compute(self, indicator, year, country).filter(|v| v.is_finite());
        self.cache.put(indicator, year, country, value);
        value
    }

    pub fn constant(&mut self, constant: Constant) -> Value {
        if let Some(hit) = self.cache.get_constant(constant) {
            return hit;
        }
        let value = constants::compute(self, constant).filter(|v| v.is_finite());
        self.cache.put_constant(constant, value);
        tracing::debug!(constant = %constant, ?value, "constant computed");

        if let Some(output) = self.output {
            if let Err(err) = output.write_constant(constant.name(), value) {
                tracing::warn!(constant = %constant, error = %err, "failed to persist constant");
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::{table_from_json, TableKind, TableName};

    fn generation() -> Generation {
        let snapshot = Snapshot::from_tables(
            1,
            [
                (
                    TableName::Oa,
                    table_from_json(&json!({"2020": {"CN": 2, "US": 0}}), TableKind::Year).unwrap(),
                ),
                (
                    TableName::Total,
                    table_from_json(&json!({"2020": {"CN": 4, "US": 0}}), TableKind::Year).unwrap(),
                ),
            ],
        );
        Generation::new(Arc::new(snapshot))
    }

    #[test]
    fn cached_values_skip_raw_reads() {
        let mut gen = generation();
        let first = gen.evaluator().value(Indicator::ROpenT, 2020, "CN");
        let reads = gen.snapshot().reads();
        let second = gen.evaluator().value(Indicator::ROpenT, 2020, "CN");

        assert_eq!(first, Some(0.5));
        assert_eq!(first, second);
        assert_eq!(gen.snapshot().reads(), reads);
    }

    #[test]
    fn unavailable_results_are_cached_too() {
        let mut gen = generation();
        assert_eq!(gen.evaluator().value(Indicator::ROpenT, 2020, "US"), None);
        let reads = gen.snapshot().reads();
        assert_eq!(gen.evaluator().value(Indicator::ROpenT, 2020, "US"), None);
        assert_eq!(gen.snapshot().reads(), reads);
        assert_eq!(gen.cache().get(Indicator::ROpenT, 2020, "US"), Some(None));
    }

    #[test]
    fn constants_are_persisted_once_computed() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputWriter::new(dir.path());
        let mut gen = generation();

        let value = gen.evaluator().with_output(&output).constant(Constant::POpenT1);

        assert_eq!(value, Some(1.0));
        let written = output.read("P_open_t1.json").unwrap();
        assert_eq!(written, json!({"value": 1.0}));
    }
}
