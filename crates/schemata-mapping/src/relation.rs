//! Relations between entities of a mapping.

use serde::{Deserialize, Serialize};

/// Handle to an entity slot inside a [`crate::Mapping`].
///
/// Handles are only meaningful for the mapping that issued them. A handle
/// whose slot has been removed stays dead: re-adding an entity with the same
/// type identifier allocates a fresh slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Handle for slot `index`, or `None` past the `u32` handle space.
    pub(crate) fn from_slot(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }
}

/// Pointer-style link: the subject holds a value at `path` that matches the
/// object's value at `target_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationReference {
    pub path: String,
    pub target_path: String,
}

/// A discovered directed link from `subject` to `object`.
///
/// Without a `reference` the relation models containment (the object is found
/// under `path` relative to the subject).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub subject: EntityId,
    pub object: EntityId,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<RelationReference>,
}

impl Relation {
    pub fn new(
        subject: EntityId,
        object: EntityId,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            subject,
            object,
            name: name.into(),
            path: path.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, path: impl Into<String>, target_path: impl Into<String>) -> Self {
        self.reference = Some(RelationReference {
            path: path.into(),
            target_path: target_path.into(),
        });
        self
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_self_relation(&self) -> bool {
        self.subject == self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_handles_stop_at_u32_max() {
        assert_eq!(EntityId::from_slot(7).map(EntityId::index), Some(7));
        assert_eq!(
            EntityId::from_slot(u32::MAX as usize).map(EntityId::index),
            Some(u32::MAX as usize)
        );
        assert_eq!(EntityId::from_slot(u32::MAX as usize + 1), None);
    }
}
