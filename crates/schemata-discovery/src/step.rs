//! Discovery steps: one refinement pass over a mapping.

use std::fmt;

use anyhow::Result;
use schemata_mapping::Mapping;

use crate::document::DataDocument;
use crate::grouping::RemoveGroupingNodes;

/// Signature shared by every step body.
pub type StepFn = dyn Fn(&[DataDocument], &mut Mapping) -> Result<()>;

/// A unit of refinement run by [`crate::DiscoveryPipeline`].
///
/// Built-in passes are variants; anything else is a named function value.
pub enum DiscoveryStep {
    RemoveGroupingNodes(RemoveGroupingNodes),
    Custom { name: String, run: Box<StepFn> },
}

impl DiscoveryStep {
    pub fn remove_grouping_nodes() -> Self {
        Self::RemoveGroupingNodes(RemoveGroupingNodes::new())
    }

    pub fn custom<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&[DataDocument], &mut Mapping) -> Result<()> + 'static,
    {
        Self::Custom {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::RemoveGroupingNodes(_) => "remove-grouping-nodes",
            Self::Custom { name, .. } => name.as_str(),
        }
    }

    /// Run the step against the shared mapping. Documents are read-only.
    pub fn process(&self, documents: &[DataDocument], mapping: &mut Mapping) -> Result<()> {
        match self {
            Self::RemoveGroupingNodes(step) => step.process(documents, mapping),
            Self::Custom { run, .. } => run(documents, mapping),
        }
    }
}

impl fmt::Debug for DiscoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveGroupingNodes(step) => {
                f.debug_tuple("RemoveGroupingNodes").field(step).finish()
            }
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

impl From<RemoveGroupingNodes> for DiscoveryStep {
    fn from(step: RemoveGroupingNodes) -> Self {
        Self::RemoveGroupingNodes(step)
    }
}
