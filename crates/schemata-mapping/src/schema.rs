//! Entities ("schemas") discovered in the documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::relation::Relation;

/// A scalar attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Source path of the value, relative to the owning entity.
    pub path: String,
    /// Scalar type of the value (for example `xs:string`).
    pub xml_type: String,
    /// Whether the attribute participates in the entity's key.
    #[serde(default)]
    pub is_key: bool,
}

impl Attribute {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        xml_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            xml_type: xml_type.into(),
            is_key: false,
        }
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }
}

/// A discovered kind of thing.
///
/// `xml_type` is the identity key inside a mapping. An entity with no
/// attributes is a grouping node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    xml_type: String,
    pub type_name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id_path: Option<String>,
    attributes: BTreeMap<String, Attribute>,
    relations: Vec<Relation>,
}

impl Schema {
    pub fn new(
        xml_type: impl Into<String>,
        type_name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            xml_type: xml_type.into(),
            type_name: type_name.into(),
            path: path.into(),
            instance_id_path: None,
            attributes: BTreeMap::new(),
            relations: Vec::new(),
        }
    }

    /// Identity key of the entity within its mapping.
    pub fn xml_type(&self) -> &str {
        &self.xml_type
    }

    /// Insert an attribute, replacing any attribute with the same name.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.attributes.insert(attribute.name.clone(), attribute)
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.add_attribute(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn attributes_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_grouping_node(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| a.is_key)
    }

    /// Append a relation held by this entity. The relation's subject should be
    /// this entity's handle; the mapping does not enforce it.
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub(crate) fn relations_mut(&mut self) -> &mut [Relation] {
        &mut self.relations
    }

    pub fn relations_count(&self) -> usize {
        self.relations.len()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Cursor over this entity's relations that allows removing the relation
    /// it last yielded.
    pub fn relation_cursor(&mut self) -> RelationCursor<'_> {
        RelationCursor {
            relations: &mut self.relations,
            next: 0,
            current: None,
        }
    }
}

/// Single-pass traversal over an entity's relations with in-place removal.
///
/// Order of the remaining relations is preserved.
pub struct RelationCursor<'a> {
    relations: &'a mut Vec<Relation>,
    next: usize,
    current: Option<usize>,
}

impl<'a> RelationCursor<'a> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Relation> {
        if self.next >= self.relations.len() {
            self.current = None;
            return None;
        }
        let idx = self.next;
        self.next += 1;
        self.current = Some(idx);
        self.relations.get(idx)
    }

    /// Remove the relation last returned by [`RelationCursor::next`].
    ///
    /// Returns `None` when nothing has been yielded yet or the current relation
    /// was already removed.
    pub fn remove_current(&mut self) -> Option<Relation> {
        let idx = self.current.take()?;
        let removed = self.relations.remove(idx);
        self.next -= 1;
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::EntityId;

    fn rel(name: &str) -> Relation {
        Relation::new(EntityId(0), EntityId(1), name, format!("/{name}"))
    }

    #[test]
    fn attribute_count_classifies_grouping_nodes() {
        let mut entity = Schema::new("urn:t:order", "Order", "/orders/order");
        assert!(entity.is_grouping_node());

        entity.add_attribute(Attribute::new("id", "@id", "xs:string").key());
        assert_eq!(entity.attributes_count(), 1);
        assert!(!entity.is_grouping_node());
        assert_eq!(entity.key_attributes().count(), 1);

        entity.remove_attribute("id");
        assert!(entity.is_grouping_node());
    }

    #[test]
    fn relation_cursor_removes_current_and_keeps_order() {
        let mut entity = Schema::new("urn:t:a", "A", "/a");
        for name in ["r1", "r2", "r3", "r4"] {
            entity.add_relation(rel(name));
        }

        let mut visited = Vec::new();
        let mut cursor = entity.relation_cursor();
        while let Some(r) = cursor.next() {
            let name = r.name.clone();
            visited.push(name.clone());
            if name == "r2" || name == "r3" {
                assert!(cursor.remove_current().is_some());
                assert!(cursor.remove_current().is_none());
            }
        }

        assert_eq!(visited, vec!["r1", "r2", "r3", "r4"]);
        let remaining: Vec<_> = entity.relations().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(remaining, vec!["r1", "r4"]);
    }

    #[test]
    fn remove_before_next_is_a_no_op() {
        let mut entity = Schema::new("urn:t:a", "A", "/a").with_attribute(Attribute::new(
            "x", "x", "xs:int",
        ));
        entity.add_relation(rel("r1"));
        let mut cursor = entity.relation_cursor();
        assert!(cursor.remove_current().is_none());
        assert_eq!(entity.relations_count(), 1);
    }
}
