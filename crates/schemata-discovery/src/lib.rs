//! Discovery pipeline for schemata mappings.
//!
//! A [`DiscoveryPipeline`] runs an ordered list of [`DiscoveryStep`]s against
//! one [`schemata_mapping::Mapping`] and the document collection it was
//! discovered from. Each step sees the cumulative effect of the steps before
//! it. Populating the mapping from documents is left to caller-supplied
//! steps; this crate ships the refinement passes.

pub mod document;
pub mod grouping;
pub mod pipeline;
pub mod step;

pub use document::DataDocument;
pub use grouping::{GroupingRemovalStats, RemoveGroupingNodes};
pub use pipeline::DiscoveryPipeline;
pub use step::{DiscoveryStep, StepFn};
