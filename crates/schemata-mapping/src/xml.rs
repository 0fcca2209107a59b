//! XML mapping description.
//!
//! Persisted layout, with `p` standing for the mapping's tag-name prefix:
//!
//! ```text
//! <p:mapping xmlns:p="{namespace uri}" xmlns:ex="..." ...>
//!   <p:entity xmlType=".." type=".." path="..">
//!     <p:id path=".."/>
//!     <p:attribute name=".." path=".." type=".." key="true"/>
//!     <p:relation name=".." path=".." targetEntityXmlType="..">
//!       <p:reference path=".." targetPath=".."/>
//!     </p:relation>
//!   </p:entity>
//! </p:mapping>
//! ```
//!
//! Relations name their object by type identifier, so reading is two-phase:
//! entities first, then relation targets are resolved against them. A
//! relation is persisted under the entity that holds it and read back with
//! that entity as subject, so the writer skips relations held elsewhere.

use std::collections::{HashMap, HashSet};

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use crate::mapping::Mapping;
use crate::namespace::NamespaceContext;
use crate::relation::{EntityId, Relation, RelationReference};
use crate::schema::{Attribute, Schema};
use crate::vocabulary::MappingVocabulary;

#[derive(Debug, thiserror::Error)]
pub enum MappingXmlError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] AttrError),

    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected root element `{found}` (expected `{expected}`)")]
    UnexpectedRoot { expected: String, found: String },

    #[error("element `{element}` is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("element `{element}` is not allowed here")]
    MisplacedElement { element: String },

    #[error("entity `{0}` is described more than once")]
    DuplicateEntity(String),

    #[error("relation `{relation}` of entity `{entity}` targets unknown entity `{target}`")]
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },
}

pub type Result<T> = std::result::Result<T, MappingXmlError>;

// ============================================================================
// Writing
// ============================================================================

/// Serialize `mapping` to its XML description.
///
/// Relations whose subject or object is gone, or whose subject is not the
/// entity holding them, are skipped with a warning.
pub fn write_mapping(mapping: &Mapping) -> Result<String> {
    let vocab = mapping.vocabulary();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let root_name = vocab.mapping_node_name();
    let mut root = BytesStart::new(root_name.as_str());
    if let Some(uri) = mapping.namespace_uri() {
        root.push_attribute((vocab.namespace_declaration().as_str(), uri));
    }
    if let Some(context) = mapping.base_namespace_context() {
        for (prefix, uri) in context.bindings() {
            if prefix == vocab.prefix {
                continue;
            }
            root.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
        }
    }
    writer.write_event(Event::Start(root))?;

    let mut skipped = 0usize;
    for (id, entity) in mapping.entities_with_ids() {
        skipped += write_entity(&mut writer, &vocab, mapping, id, entity)?;
    }

    writer.write_event(Event::End(BytesEnd::new(root_name.as_str())))?;
    debug!(
        entities = mapping.len(),
        skipped_relations = skipped,
        "wrote mapping description"
    );
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_entity(
    writer: &mut Writer<Vec<u8>>,
    vocab: &MappingVocabulary,
    mapping: &Mapping,
    holder: EntityId,
    entity: &Schema,
) -> Result<usize> {
    let entity_name = vocab.entity_node_name();
    let mut start = BytesStart::new(entity_name.as_str());
    start.push_attribute((vocab.xml_type_attr, entity.xml_type()));
    start.push_attribute((vocab.type_attr, entity.type_name.as_str()));
    start.push_attribute((vocab.path_attr, entity.path.as_str()));
    writer.write_event(Event::Start(start))?;

    if let Some(id_path) = &entity.instance_id_path {
        let id_name = vocab.id_node_name();
        let mut id = BytesStart::new(id_name.as_str());
        id.push_attribute((vocab.path_attr, id_path.as_str()));
        writer.write_event(Event::Empty(id))?;
    }

    let attribute_name = vocab.attribute_node_name();
    for attribute in entity.attributes() {
        let mut elem = BytesStart::new(attribute_name.as_str());
        elem.push_attribute((vocab.name_attr, attribute.name.as_str()));
        elem.push_attribute((vocab.path_attr, attribute.path.as_str()));
        elem.push_attribute((vocab.type_attr, attribute.xml_type.as_str()));
        if attribute.is_key {
            elem.push_attribute((vocab.key_attr, "true"));
        }
        writer.write_event(Event::Empty(elem))?;
    }

    let relation_name = vocab.relation_node_name();
    let mut skipped = 0;
    for relation in entity.relations() {
        if relation.subject != holder {
            warn!(
                entity = entity.xml_type(),
                relation = %relation.name,
                "skipping relation whose subject is another entity"
            );
            skipped += 1;
            continue;
        }
        let target = match mapping.entity_by_handle(relation.object) {
            Some(target) if mapping.is_live(relation.subject) => target,
            _ => {
                warn!(
                    entity = entity.xml_type(),
                    relation = %relation.name,
                    "skipping relation with a missing endpoint"
                );
                skipped += 1;
                continue;
            }
        };

        let mut elem = BytesStart::new(relation_name.as_str());
        elem.push_attribute((vocab.name_attr, relation.name.as_str()));
        elem.push_attribute((vocab.path_attr, relation.path.as_str()));
        elem.push_attribute((vocab.target_entity_xml_type_attr, target.xml_type()));

        match &relation.reference {
            None => writer.write_event(Event::Empty(elem))?,
            Some(reference) => {
                writer.write_event(Event::Start(elem))?;
                let reference_name = vocab.reference_node_name();
                let mut r = BytesStart::new(reference_name.as_str());
                r.push_attribute((vocab.reference_path_attr, reference.path.as_str()));
                r.push_attribute((
                    vocab.reference_target_path_attr,
                    reference.target_path.as_str(),
                ));
                writer.write_event(Event::Empty(r))?;
                writer.write_event(Event::End(BytesEnd::new(relation_name.as_str())))?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new(entity_name.as_str())))?;
    Ok(skipped)
}

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug)]
struct RelationRecord {
    name: String,
    path: String,
    target: String,
    reference: Option<RelationReference>,
}

#[derive(Debug)]
struct EntityRecord {
    entity: Schema,
    relations: Vec<RelationRecord>,
}

#[derive(Debug, Default)]
struct ReadState {
    root_seen: bool,
    namespace_uri: Option<String>,
    context: NamespaceContext,
    entities: Vec<EntityRecord>,
    entity: Option<EntityRecord>,
    relation: Option<RelationRecord>,
}

/// Parse an XML mapping description whose elements use `prefix`.
///
/// The mapping namespace URI is taken from the root's `xmlns:{prefix}`
/// declaration; other `xmlns:*` declarations become the base namespace
/// context. Unknown elements are ignored.
pub fn read_mapping(xml: &str, prefix: &str) -> Result<Mapping> {
    let vocab = MappingVocabulary::new(prefix);
    let names = ElementNames::new(&vocab);
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut state = ReadState::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => open_element(&mut state, &vocab, &names, &e, false)?,
            Event::Empty(e) => open_element(&mut state, &vocab, &names, &e, true)?,
            Event::End(e) => close_element(&mut state, &names, e.name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    if !state.root_seen {
        return Err(MappingXmlError::MissingRoot);
    }
    build_mapping(state, prefix)
}

struct ElementNames {
    mapping: String,
    entity: String,
    attribute: String,
    relation: String,
    reference: String,
    id: String,
}

impl ElementNames {
    fn new(vocab: &MappingVocabulary) -> Self {
        Self {
            mapping: vocab.mapping_node_name(),
            entity: vocab.entity_node_name(),
            attribute: vocab.attribute_node_name(),
            relation: vocab.relation_node_name(),
            reference: vocab.reference_node_name(),
            id: vocab.id_node_name(),
        }
    }
}

fn open_element(
    state: &mut ReadState,
    vocab: &MappingVocabulary,
    names: &ElementNames,
    e: &BytesStart<'_>,
    empty: bool,
) -> Result<()> {
    let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = attributes_of(e)?;

    if !state.root_seen {
        if element != names.mapping {
            return Err(MappingXmlError::UnexpectedRoot {
                expected: names.mapping.clone(),
                found: element,
            });
        }
        state.root_seen = true;
        for (key, value) in attrs {
            let Some(bound) = key.strip_prefix("xmlns:") else {
                continue;
            };
            if bound == vocab.prefix {
                state.namespace_uri = Some(value);
            } else {
                state.context.bind(bound, value);
            }
        }
        return Ok(());
    }

    if element == names.entity {
        if state.entity.is_some() {
            return Err(MappingXmlError::MisplacedElement { element });
        }
        let xml_type = required(&mut attrs, &element, vocab.xml_type_attr)?;
        let type_name = attrs.remove(vocab.type_attr).unwrap_or_default();
        let path = attrs.remove(vocab.path_attr).unwrap_or_default();
        let record = EntityRecord {
            entity: Schema::new(xml_type, type_name, path),
            relations: Vec::new(),
        };
        if empty {
            state.entities.push(record);
        } else {
            state.entity = Some(record);
        }
    } else if element == names.id {
        let record = state
            .entity
            .as_mut()
            .ok_or_else(|| MappingXmlError::MisplacedElement {
                element: element.clone(),
            })?;
        record.entity.instance_id_path = Some(required(&mut attrs, &element, vocab.path_attr)?);
    } else if element == names.attribute {
        let record = state
            .entity
            .as_mut()
            .ok_or_else(|| MappingXmlError::MisplacedElement {
                element: element.clone(),
            })?;
        let name = required(&mut attrs, &element, vocab.name_attr)?;
        let path = attrs.remove(vocab.path_attr).unwrap_or_default();
        let xml_type = attrs.remove(vocab.type_attr).unwrap_or_default();
        let mut attribute = Attribute::new(name, path, xml_type);
        attribute.is_key = attrs.get(vocab.key_attr).is_some_and(|v| v == "true");
        record.entity.add_attribute(attribute);
    } else if element == names.relation {
        if state.entity.is_none() || state.relation.is_some() {
            return Err(MappingXmlError::MisplacedElement { element });
        }
        let relation = RelationRecord {
            name: required(&mut attrs, &element, vocab.name_attr)?,
            path: attrs.remove(vocab.path_attr).unwrap_or_default(),
            target: required(&mut attrs, &element, vocab.target_entity_xml_type_attr)?,
            reference: None,
        };
        match (empty, state.entity.as_mut()) {
            (true, Some(record)) => record.relations.push(relation),
            _ => state.relation = Some(relation),
        }
    } else if element == names.reference {
        let path = required(&mut attrs, &element, vocab.reference_path_attr)?;
        let target_path = required(&mut attrs, &element, vocab.reference_target_path_attr)?;
        let relation = state
            .relation
            .as_mut()
            .ok_or(MappingXmlError::MisplacedElement { element })?;
        relation.reference = Some(RelationReference { path, target_path });
    } else {
        debug!(element = %element, "ignoring unknown element in mapping description");
    }
    Ok(())
}

fn close_element(state: &mut ReadState, names: &ElementNames, name: &[u8]) {
    if name == names.relation.as_bytes() {
        if let (Some(relation), Some(record)) = (state.relation.take(), state.entity.as_mut()) {
            record.relations.push(relation);
        }
    } else if name == names.entity.as_bytes() {
        if let Some(record) = state.entity.take() {
            state.entities.push(record);
        }
    }
}

fn build_mapping(state: ReadState, prefix: &str) -> Result<Mapping> {
    let mut mapping = match state.namespace_uri {
        Some(uri) => Mapping::with_namespace(uri, prefix),
        None => {
            let mut mapping = Mapping::with_namespace(String::new(), prefix);
            mapping.clear_namespace_uri();
            mapping
        }
    };
    mapping.set_base_namespace_context(state.context);

    let mut seen = HashSet::new();
    let mut pending = Vec::with_capacity(state.entities.len());
    for record in state.entities {
        let xml_type = record.entity.xml_type().to_string();
        if !seen.insert(xml_type.clone()) {
            return Err(MappingXmlError::DuplicateEntity(xml_type));
        }
        let id = mapping.add_entity(record.entity);
        pending.push((id, xml_type, record.relations));
    }

    for (subject, xml_type, relations) in pending {
        for record in relations {
            let object = mapping.entity_id(&record.target).ok_or_else(|| {
                MappingXmlError::UnknownRelationTarget {
                    entity: xml_type.clone(),
                    relation: record.name.clone(),
                    target: record.target.clone(),
                }
            })?;
            let mut relation = Relation::new(subject, object, record.name, record.path);
            relation.reference = record.reference;
            if let Some(entity) = mapping.entity_by_handle_mut(subject) {
                entity.add_relation(relation);
            }
        }
    }

    debug!(
        entities = mapping.len(),
        relations = mapping.relations_count(),
        "read mapping description"
    );
    Ok(mapping)
}

fn attributes_of(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

fn required(attrs: &mut HashMap<String, String>, element: &str, attribute: &str) -> Result<String> {
    attrs
        .remove(attribute)
        .ok_or_else(|| MappingXmlError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sm:mapping xmlns:sm="urn:test:mapping" xmlns:ex="http://example.org/">
  <sm:entity xmlType="urn:ex:order" type="Order" path="/orders/order">
    <sm:id path="@id"/>
    <sm:attribute name="id" path="@id" type="xs:string" key="true"/>
    <sm:attribute name="total" path="total" type="xs:decimal"/>
    <sm:relation name="hasLines" path="lines" targetEntityXmlType="urn:ex:lines"/>
    <sm:relation name="customer" path="." targetEntityXmlType="urn:ex:customer">
      <sm:reference path="@customer" targetPath="@id"/>
    </sm:relation>
  </sm:entity>
  <sm:entity xmlType="urn:ex:lines" type="Lines" path="/orders/order/lines"/>
  <sm:entity xmlType="urn:ex:customer" type="Customer" path="/customers/customer">
    <sm:attribute name="id" path="@id" type="xs:string"/>
  </sm:entity>
</sm:mapping>"#;

    #[test]
    fn reads_entities_relations_and_namespaces() {
        let mapping = read_mapping(SAMPLE, "sm").unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.namespace_uri(), Some("urn:test:mapping"));
        assert_eq!(
            mapping
                .base_namespace_context()
                .and_then(|c| c.uri_for_prefix("ex")),
            Some("http://example.org/")
        );

        let order = mapping.entity("urn:ex:order").unwrap();
        assert_eq!(order.type_name, "Order");
        assert_eq!(order.instance_id_path.as_deref(), Some("@id"));
        assert_eq!(order.attributes_count(), 2);
        assert!(order.attribute("id").unwrap().is_key);
        assert_eq!(order.relations_count(), 2);

        let customer = order.relation("customer").unwrap();
        assert_eq!(Some(customer.object), mapping.entity_id("urn:ex:customer"));
        assert_eq!(
            customer.reference,
            Some(RelationReference {
                path: "@customer".into(),
                target_path: "@id".into(),
            })
        );
        assert!(mapping.entity("urn:ex:lines").unwrap().is_grouping_node());
    }

    #[test]
    fn write_then_read_preserves_structure() {
        let original = read_mapping(SAMPLE, "sm").unwrap();
        let xml = write_mapping(&original).unwrap();
        assert!(xml.contains("<sm:mapping"));
        assert!(xml.contains(r#"xmlns:sm="urn:test:mapping""#));
        assert!(xml.contains(r#"targetEntityXmlType="urn:ex:customer""#));

        let reread = read_mapping(&xml, "sm").unwrap();
        assert_eq!(reread.len(), original.len());
        assert_eq!(reread.relations_count(), original.relations_count());
        assert_eq!(
            reread.entity("urn:ex:order"),
            original.entity("urn:ex:order")
        );
    }

    #[test]
    fn writer_skips_dangling_relations() {
        let mut mapping = Mapping::with_namespace("urn:test", "sm");
        let a = mapping.add_entity(Schema::new("a", "A", "/a"));
        let b = mapping.add_entity(Schema::new("b", "B", "/b"));
        if let Some(entity) = mapping.entity_mut("a") {
            entity.add_relation(Relation::new(a, b, "toB", "b"));
        }
        mapping.remove_entity("b");

        let xml = write_mapping(&mapping).unwrap();
        assert!(!xml.contains("toB"));
        let reread = read_mapping(&xml, "sm").unwrap();
        assert_eq!(reread.relations_count(), 0);
    }

    #[test]
    fn writer_skips_relations_held_by_another_entity() {
        let mut mapping = Mapping::with_namespace("urn:test", "sm");
        let a = mapping.add_entity(Schema::new("a", "A", "/a"));
        let b = mapping.add_entity(Schema::new("b", "B", "/b"));
        if let Some(entity) = mapping.entity_mut("a") {
            entity.add_relation(Relation::new(a, b, "owned", "b"));
            entity.add_relation(Relation::new(b, a, "borrowed", ".."));
        }

        let xml = write_mapping(&mapping).unwrap();
        assert!(xml.contains("owned"));
        assert!(!xml.contains("borrowed"));

        let reread = read_mapping(&xml, "sm").unwrap();
        let owned = reread.entity("a").unwrap().relation("owned").unwrap();
        assert_eq!(Some(owned.subject), reread.entity_id("a"));
        assert_eq!(Some(owned.object), reread.entity_id("b"));
        assert_eq!(reread.relations_count(), 1);
    }

    #[test]
    fn unknown_relation_target_is_rejected() {
        let xml = r#"<sm:mapping xmlns:sm="urn:t">
  <sm:entity xmlType="a"><sm:relation name="r" targetEntityXmlType="nope"/></sm:entity>
</sm:mapping>"#;
        let err = read_mapping(xml, "sm").unwrap_err();
        assert!(matches!(err, MappingXmlError::UnknownRelationTarget { ref target, .. } if target == "nope"));
    }

    #[test]
    fn structural_errors_are_reported() {
        assert!(matches!(
            read_mapping("", "sm"),
            Err(MappingXmlError::MissingRoot)
        ));
        assert!(matches!(
            read_mapping("<other:mapping/>", "sm"),
            Err(MappingXmlError::UnexpectedRoot { .. })
        ));
        assert!(matches!(
            read_mapping(r#"<sm:mapping><sm:entity type="x"/></sm:mapping>"#, "sm"),
            Err(MappingXmlError::MissingAttribute { .. })
        ));
        assert!(matches!(
            read_mapping(
                r#"<sm:mapping><sm:attribute name="x"/></sm:mapping>"#,
                "sm"
            ),
            Err(MappingXmlError::MisplacedElement { .. })
        ));
        assert!(matches!(
            read_mapping(
                r#"<sm:mapping><sm:entity xmlType="a"/><sm:entity xmlType="a"/></sm:mapping>"#,
                "sm"
            ),
            Err(MappingXmlError::DuplicateEntity(_))
        ));
    }

    #[test]
    fn missing_namespace_declaration_leaves_uri_unset() {
        let mut mapping = read_mapping(r#"<sm:mapping/>"#, "sm").unwrap();
        assert!(mapping.is_empty());
        assert_eq!(mapping.namespace_uri(), None);
        assert!(!mapping.set_initialized());
    }
}
