//! The two entry points callers trigger: reload the dataset, and run the batch.

use thiserror::Error;

use crate::batch::{BatchReport, Materializer, OutputWriter};
use crate::data::{validate_snapshot, DatasetStore, LoadReport, StoreError, ValidationReport, Value};
use crate::indicators::{Constant, Generation, Indicator};
use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct Engine {
    store: DatasetStore,
    generation: Generation,
    output: OutputWriter,
    materializer: Materializer,
}

impl Engine {
    /// Build an engine from settings. Nothing is loaded until [Engine::reload].
    pub fn new(settings: &Settings) -> Self {
        Engine::from_parts(
            DatasetStore::open(&settings.data_dir, settings.repair_from_backup),
            OutputWriter::new(&settings.output_dir),
        )
    }

    pub fn from_parts(store: DatasetStore, output: OutputWriter) -> Self {
        let generation = Generation::new(store.snapshot());
        Engine {
            store,
            generation,
            output,
            materializer: Materializer::default(),
        }
    }

    pub fn with_materializer(mut self, materializer: Materializer) -> Self {
        self.materializer = materializer;
        self
    }

    /// Load a fresh snapshot and start a new generation with an empty result cache.
    /// On failure the current generation, cache included, stays in place.
    pub fn reload(&mut self) -> Result<LoadReport, EngineError> {
        let report = self.store.load()?;
        self.generation = Generation::new(self.store.snapshot());
        tracing::info!(generation = report.generation, "result cache reset for new generation");
        Ok(report)
    }

    pub fn run_batch(&mut self) -> BatchReport {
        let mut ev = self.generation.evaluator().with_output(&self.output);
        self.materializer.run(&mut ev, &self.output)
    }

    pub fn value(&mut self, indicator: Indicator, year: i32, country: &str) -> Value {
        self.generation
            .evaluator()
            .with_output(&self.output)
            .value(indicator, year, country)
    }

    pub fn constant(&mut self, constant: Constant) -> Value {
        self.generation
            .evaluator()
            .with_output(&self.output)
            .constant(constant)
    }

    pub fn validate(&self) -> ValidationReport {
        validate_snapshot(self.generation.snapshot())
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn output(&self) -> &OutputWriter {
        &self.output
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }
}
