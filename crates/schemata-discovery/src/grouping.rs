//! Grouping-node removal.
//!
//! A grouping node is an entity with no attributes: a structural wrapper
//! such as `<lines>` around repeated `<line>` elements. Removing them leaves
//! the entities that carry data, and pruning afterwards drops the relations
//! that pointed into or out of the removed wrappers.

use anyhow::Result;
use schemata_mapping::Mapping;
use tracing::{debug, info};

use crate::document::DataDocument;

/// Outcome of one grouping-node removal pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingRemovalStats {
    pub entities_removed: usize,
    pub relations_removed: usize,
}

/// Removes attribute-less entities, then every relation left dangling.
///
/// One pass only: an entity that loses all its attributes as a consequence of
/// this pass is left for the next run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveGroupingNodes;

impl RemoveGroupingNodes {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, _documents: &[DataDocument], mapping: &mut Mapping) -> Result<()> {
        self.apply(mapping);
        Ok(())
    }

    /// Run the pass and report what it removed.
    pub fn apply(&self, mapping: &mut Mapping) -> GroupingRemovalStats {
        let mut stats = GroupingRemovalStats::default();

        let mut entities = mapping.entity_cursor();
        while let Some(entity) = entities.next() {
            if entity.attributes_count() == 0 {
                debug!(
                    entity = entity.xml_type(),
                    relations = entity.relations_count(),
                    "removing grouping node"
                );
                entities.remove_current();
                stats.entities_removed += 1;
            }
        }

        // Relations held by later entities may point at nodes removed above.
        stats.relations_removed = mapping.remove_invalid_relations();

        info!(
            entities_removed = stats.entities_removed,
            relations_removed = stats.relations_removed,
            remaining = mapping.len(),
            "removed grouping nodes"
        );
        stats
    }
}
