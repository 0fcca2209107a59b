//! Ordered execution of discovery steps over one mapping.

use std::time::Instant;

use anyhow::{Context, Result};
use schemata_mapping::{Mapping, MappingConfig};
use tracing::{debug, info, warn};

use crate::document::DataDocument;
use crate::step::DiscoveryStep;

/// Runs its steps in order, each exactly once, against the same documents and
/// the same mapping. The first failing step stops the run; nothing is rolled
/// back.
#[derive(Debug, Default)]
pub struct DiscoveryPipeline {
    steps: Vec<DiscoveryStep>,
}

impl DiscoveryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: impl Into<DiscoveryStep>) -> Self {
        self.push(step);
        self
    }

    pub fn push(&mut self, step: impl Into<DiscoveryStep>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[DiscoveryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn run(&self, documents: &[DataDocument], mapping: &mut Mapping) -> Result<()> {
        for (position, step) in self.steps.iter().enumerate() {
            let started = Instant::now();
            debug!(step = step.name(), position, "running discovery step");
            step.process(documents, mapping).with_context(|| {
                format!(
                    "discovery step `{}` (#{}) failed",
                    step.name(),
                    position + 1
                )
            })?;
            debug!(
                step = step.name(),
                entities = mapping.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "discovery step finished"
            );
        }
        Ok(())
    }

    /// Run the pipeline over `mapping`, then mark it initialized.
    ///
    /// A mapping that cannot be initialized (missing namespace state) is
    /// still returned; callers can check [`Mapping::is_initialized`].
    pub fn discover(&self, documents: &[DataDocument], mut mapping: Mapping) -> Result<Mapping> {
        self.run(documents, &mut mapping)?;
        if !mapping.set_initialized() {
            warn!("mapping is missing namespace state and was not marked initialized");
        }
        info!(
            documents = documents.len(),
            steps = self.steps.len(),
            entities = mapping.len(),
            relations = mapping.relations_count(),
            "discovery finished"
        );
        Ok(mapping)
    }

    /// [`DiscoveryPipeline::discover`] starting from an empty mapping.
    pub fn discover_with_config(
        &self,
        documents: &[DataDocument],
        config: &MappingConfig,
    ) -> Result<Mapping> {
        self.discover(documents, Mapping::from_config(config))
    }
}
