//! The mapping: aggregate root of a discovered schema graph.
//!
//! Entities live in an arena of slots. Removing an entity leaves a tombstone,
//! so [`EntityId`] handles held by relations never alias a different entity
//! and traversal with removal is a plain index walk (see [`EntityCursor`]).
//! Tombstones accumulate until [`Mapping::compact`] renumbers the survivors.

use std::collections::HashMap;
use std::fmt;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::MappingConfig;
use crate::namespace::NamespaceContext;
use crate::relation::{EntityId, Relation};
use crate::schema::Schema;
use crate::vocabulary::MappingVocabulary;

#[derive(Debug, Clone)]
pub struct Mapping {
    initialized: bool,
    namespace_uri: Option<String>,
    base_namespace_context: Option<NamespaceContext>,
    tag_name_prefix: String,
    slots: Vec<Option<Schema>>,
    index: HashMap<String, EntityId>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self::from_config(&MappingConfig::default())
    }

    pub fn with_namespace(namespace_uri: impl Into<String>, tag_name_prefix: impl Into<String>) -> Self {
        Self {
            initialized: false,
            namespace_uri: Some(namespace_uri.into()),
            base_namespace_context: Some(NamespaceContext::new()),
            tag_name_prefix: tag_name_prefix.into(),
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_config(config: &MappingConfig) -> Self {
        Self::with_namespace(config.namespace_uri.clone(), config.tag_name_prefix.clone())
    }

    // ------------------------------------------------------------------------
    // Initialization and namespace state
    // ------------------------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the mapping ready for consumers.
    ///
    /// Succeeds only when both the base namespace context and the namespace
    /// URI are set. On failure the flag is left as it was.
    pub fn set_initialized(&mut self) -> bool {
        if self.base_namespace_context.is_none() || self.namespace_uri.is_none() {
            return false;
        }
        self.initialized = true;
        self.initialized
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn set_namespace_uri(&mut self, uri: impl Into<String>) {
        self.namespace_uri = Some(uri.into());
    }

    pub fn clear_namespace_uri(&mut self) {
        self.namespace_uri = None;
    }

    pub fn base_namespace_context(&self) -> Option<&NamespaceContext> {
        self.base_namespace_context.as_ref()
    }

    pub fn base_namespace_context_mut(&mut self) -> Option<&mut NamespaceContext> {
        self.base_namespace_context.as_mut()
    }

    pub fn set_base_namespace_context(&mut self, context: NamespaceContext) {
        self.base_namespace_context = Some(context);
    }

    pub fn clear_base_namespace_context(&mut self) {
        self.base_namespace_context = None;
    }

    pub fn tag_name_prefix(&self) -> &str {
        &self.tag_name_prefix
    }

    pub fn vocabulary(&self) -> MappingVocabulary {
        MappingVocabulary::new(self.tag_name_prefix.clone())
    }

    // ------------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------------

    /// Insert `entity`, overwriting any live entity with the same type
    /// identifier. An overwrite reuses the existing slot, so relations that
    /// point at the old entity now point at the new one.
    ///
    /// # Panics
    ///
    /// Panics when a new slot would exceed the `u32` handle space.
    /// [`Mapping::compact`] reclaims removed slots.
    pub fn add_entity(&mut self, entity: Schema) -> EntityId {
        if let Some(&id) = self.index.get(entity.xml_type()) {
            self.slots[id.index()] = Some(entity);
            return id;
        }
        let Some(id) = EntityId::from_slot(self.slots.len()) else {
            panic!(
                "entity handle space exhausted at {} slots; compact the mapping",
                self.slots.len()
            );
        };
        self.index.insert(entity.xml_type().to_string(), id);
        self.slots.push(Some(entity));
        id
    }

    pub fn entity(&self, xml_type: &str) -> Option<&Schema> {
        let id = self.index.get(xml_type)?;
        self.entity_by_handle(*id)
    }

    pub fn entity_mut(&mut self, xml_type: &str) -> Option<&mut Schema> {
        let id = *self.index.get(xml_type)?;
        self.entity_by_handle_mut(id)
    }

    pub fn entity_id(&self, xml_type: &str) -> Option<EntityId> {
        self.index.get(xml_type).copied()
    }

    pub fn entity_by_handle(&self, id: EntityId) -> Option<&Schema> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn entity_by_handle_mut(&mut self, id: EntityId) -> Option<&mut Schema> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Remove the entity keyed by `xml_type`. Relations pointing at it are
    /// left in place; call [`Mapping::remove_invalid_relations`] afterwards.
    pub fn remove_entity(&mut self, xml_type: &str) -> Option<Schema> {
        let id = self.index.remove(xml_type)?;
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    pub fn contains(&self, xml_type: &str) -> bool {
        self.index.contains_key(xml_type)
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live entities in slot (insertion) order.
    pub fn entities(&self) -> impl Iterator<Item = &Schema> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn entities_with_ids(&self) -> impl Iterator<Item = (EntityId, &Schema)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (EntityId(i as u32), e)))
    }

    /// Drop removed slots and renumber the live entities in slot order.
    ///
    /// Dangling relations are removed first; the rest are rewritten to the
    /// new handles. Handles obtained before the call are invalidated.
    /// Returns the number of slots reclaimed.
    pub fn compact(&mut self) -> usize {
        let reclaimed = self.slots.len() - self.index.len();
        if reclaimed == 0 {
            return 0;
        }
        self.remove_invalid_relations();

        let mut remap = Vec::with_capacity(self.slots.len());
        let mut live = 0u32;
        for slot in &self.slots {
            if slot.is_some() {
                remap.push(Some(EntityId(live)));
                live += 1;
            } else {
                remap.push(None);
            }
        }
        let renumber = |id: EntityId| remap.get(id.index()).copied().flatten().unwrap_or(id);

        self.slots.retain(Option::is_some);
        self.index.clear();
        for (i, entity) in self.slots.iter_mut().flatten().enumerate() {
            for relation in entity.relations_mut() {
                relation.subject = renumber(relation.subject);
                relation.object = renumber(relation.object);
            }
            self.index.insert(entity.xml_type().to_string(), EntityId(i as u32));
        }
        debug!(reclaimed, live = self.slots.len(), "compacted mapping");
        reclaimed
    }

    /// Traversal over the live entities that allows removing the entity last
    /// yielded.
    pub fn entity_cursor(&mut self) -> EntityCursor<'_> {
        EntityCursor {
            mapping: self,
            next: 0,
            current: None,
        }
    }

    // ------------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------------

    /// Every relation held by a live entity.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.entities().flat_map(|e| e.relations().iter())
    }

    pub fn relations_count(&self) -> usize {
        self.entities().map(Schema::relations_count).sum()
    }

    /// Relations whose object is the entity keyed by `xml_type`.
    pub fn incoming_relations<'a>(&'a self, xml_type: &str) -> impl Iterator<Item = &'a Relation> + 'a {
        let target = self.entity_id(xml_type);
        self.relations()
            .filter(move |r| target.is_some_and(|id| r.object == id))
    }

    pub fn is_valid_relation(&self, relation: &Relation) -> bool {
        self.is_live(relation.subject) && self.is_live(relation.object)
    }

    /// Drop every relation whose subject or object is no longer in the
    /// mapping. Returns the number of relations removed.
    pub fn remove_invalid_relations(&mut self) -> usize {
        let live: Vec<bool> = self.slots.iter().map(Option::is_some).collect();
        let is_live = |id: EntityId| live.get(id.index()).copied().unwrap_or(false);

        let mut removed = 0;
        let mut entities = self.entity_cursor();
        while let Some(entity) = entities.next() {
            let mut relations = entity.relation_cursor();
            while let Some(rel) = relations.next() {
                if !(is_live(rel.subject) && is_live(rel.object)) {
                    relations.remove_current();
                    removed += 1;
                }
            }
        }
        removed
    }

    fn describe_relation(&self, relation: &Relation) -> Value {
        let endpoint = |id: EntityId| {
            self.entity_by_handle(id)
                .map(|e| Value::String(e.xml_type().to_string()))
                .unwrap_or(Value::Null)
        };
        let mut obj = Map::new();
        obj.insert("name".into(), json!(relation.name));
        obj.insert("path".into(), json!(relation.path));
        obj.insert("subject".into(), endpoint(relation.subject));
        obj.insert("object".into(), endpoint(relation.object));
        if let Some(reference) = &relation.reference {
            obj.insert(
                "reference".into(),
                json!({ "path": reference.path, "targetPath": reference.target_path }),
            );
        }
        Value::Object(obj)
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entities = Map::new();
        for entity in self.entities() {
            let attributes: Map<String, Value> = entity
                .attributes()
                .map(|a| {
                    (
                        a.name.clone(),
                        json!({ "path": a.path, "type": a.xml_type, "key": a.is_key }),
                    )
                })
                .collect();
            let relations: Vec<Value> = entity
                .relations()
                .iter()
                .map(|r| self.describe_relation(r))
                .collect();
            entities.insert(
                entity.xml_type().to_string(),
                json!({
                    "type": entity.type_name,
                    "path": entity.path,
                    "attributes": attributes,
                    "relations": relations,
                }),
            );
        }

        let summary = json!({
            "Mapping": {
                "initialized": self.initialized,
                "namespaceUri": self.namespace_uri,
                "baseNamespaceContext": self.base_namespace_context.as_ref().map(|c| c.to_string()),
                "entities": entities,
                "tagNamePrefix": self.tag_name_prefix,
            }
        });
        write!(f, "{summary}")
    }
}

/// Single-pass traversal over a mapping's entities with removal.
///
/// Every entity live when the cursor is created is yielded exactly once, in
/// slot order. [`EntityCursor::remove_current`] tombstones the entity last
/// yielded; it is not yielded again and the rest of the traversal is
/// unaffected. Relations are not touched.
pub struct EntityCursor<'a> {
    mapping: &'a mut Mapping,
    next: usize,
    current: Option<usize>,
}

impl<'a> EntityCursor<'a> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&mut Schema> {
        self.current = None;
        while self.next < self.mapping.slots.len() {
            let idx = self.next;
            self.next += 1;
            if self.mapping.slots[idx].is_some() {
                self.current = Some(idx);
                return self.mapping.slots[idx].as_mut();
            }
        }
        None
    }

    /// Handle of the entity last yielded, if it has not been removed.
    pub fn current_id(&self) -> Option<EntityId> {
        self.current.map(|idx| EntityId(idx as u32))
    }

    /// Remove the entity last returned by [`EntityCursor::next`].
    pub fn remove_current(&mut self) -> Option<Schema> {
        let idx = self.current.take()?;
        let entity = self.mapping.slots.get_mut(idx).and_then(Option::take)?;
        self.mapping.index.remove(entity.xml_type());
        Some(entity)
    }
}
