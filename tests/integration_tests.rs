//! Integration tests for the complete schemata pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - XML mapping description → Mapping → discovery pipeline → XML file
//! - Caller-supplied population steps followed by built-in refinement
//!
//! Run with: cargo test --test integration_tests

use anyhow::Result;
use schemata_discovery::{DataDocument, DiscoveryPipeline, DiscoveryStep, RemoveGroupingNodes};
use schemata_mapping::{
    read_mapping, write_mapping, Attribute, Mapping, MappingConfig, NamespaceContext, Relation,
    Schema,
};

// ============================================================================
// Scenario graphs
// ============================================================================

fn relation_names(mapping: &Mapping) -> Vec<String> {
    let mut names: Vec<String> = mapping.relations().map(|r| r.name.clone()).collect();
    names.sort();
    names
}

#[test]
fn test_chain_through_grouping_node() {
    let xml = r#"<sm:mapping xmlns:sm="urn:test">
  <sm:entity xmlType="A" type="A" path="/a">
    <sm:attribute name="x" path="@x" type="xs:string"/>
    <sm:relation name="AB" path="b" targetEntityXmlType="B"/>
    <sm:relation name="AC" path="c" targetEntityXmlType="C"/>
  </sm:entity>
  <sm:entity xmlType="B" type="B" path="/a/b">
    <sm:relation name="BC" path="c" targetEntityXmlType="C"/>
  </sm:entity>
  <sm:entity xmlType="C" type="C" path="/a/c">
    <sm:attribute name="y" path="@y" type="xs:string"/>
  </sm:entity>
</sm:mapping>"#;

    let mut mapping = read_mapping(xml, "sm").expect("should parse");
    assert_eq!(mapping.relations_count(), 3);

    DiscoveryPipeline::new()
        .with_step(DiscoveryStep::remove_grouping_nodes())
        .run(&[], &mut mapping)
        .expect("pipeline should succeed");

    let mut keys: Vec<String> = mapping.entities().map(|e| e.xml_type().to_string()).collect();
    keys.sort();
    assert_eq!(keys, vec!["A", "C"]);
    assert_eq!(relation_names(&mapping), vec!["AC"]);
}

#[test]
fn test_pruned_mapping_survives_xml_round_trip() {
    let xml = r#"<sm:mapping xmlns:sm="urn:test" xmlns:ex="http://example.org/">
  <sm:entity xmlType="ex:book" type="Book" path="/lib/book">
    <sm:id path="@isbn"/>
    <sm:attribute name="isbn" path="@isbn" type="xs:string" key="true"/>
    <sm:relation name="authors" path="authors" targetEntityXmlType="ex:authors"/>
    <sm:relation name="writtenBy" path="." targetEntityXmlType="ex:person">
      <sm:reference path="@author" targetPath="@id"/>
    </sm:relation>
  </sm:entity>
  <sm:entity xmlType="ex:authors" type="Authors" path="/lib/book/authors">
    <sm:relation name="author" path="author" targetEntityXmlType="ex:person"/>
  </sm:entity>
  <sm:entity xmlType="ex:person" type="Person" path="/lib/person">
    <sm:attribute name="id" path="@id" type="xs:string" key="true"/>
    <sm:attribute name="name" path="name" type="xs:string"/>
  </sm:entity>
</sm:mapping>"#;

    let mapping = read_mapping(xml, "sm").unwrap();
    let docs = vec![DataDocument::new("lib.xml", "<lib/>")];
    let refined = DiscoveryPipeline::new()
        .with_step(RemoveGroupingNodes::new())
        .discover(&docs, mapping)
        .unwrap();
    assert!(refined.is_initialized());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pruned.xml");
    std::fs::write(&path, write_mapping(&refined).unwrap()).unwrap();
    let reread = read_mapping(&std::fs::read_to_string(&path).unwrap(), "sm").unwrap();

    assert_eq!(reread.len(), 2);
    assert!(!reread.contains("ex:authors"));
    assert_eq!(relation_names(&reread), vec!["writtenBy"]);
    let book = reread.entity("ex:book").unwrap();
    assert_eq!(book.instance_id_path.as_deref(), Some("@isbn"));
    assert!(book.relation("writtenBy").unwrap().is_reference());
    assert_eq!(
        reread
            .base_namespace_context()
            .and_then(|c| c.uri_for_prefix("ex")),
        Some("http://example.org/")
    );
}

// ============================================================================
// Population + refinement
// ============================================================================

/// Stand-in population step: one entity per document, each wrapped in a
/// grouping entity named after the document.
fn populate(documents: &[DataDocument], mapping: &mut Mapping) -> Result<()> {
    for doc in documents {
        let wrapper = mapping.add_entity(Schema::new(
            format!("{}#root", doc.source),
            "Root",
            "/",
        ));
        let record = mapping.add_entity(
            Schema::new(format!("{}#record", doc.source), "Record", "/record")
                .with_attribute(Attribute::new("body", "text()", "xs:string")),
        );
        if let Some(entity) = mapping.entity_by_handle_mut(wrapper) {
            entity.add_relation(Relation::new(wrapper, record, "record", "record"));
        }
        if let Some(entity) = mapping.entity_by_handle_mut(record) {
            entity.add_relation(Relation::new(record, wrapper, "parent", ".."));
        }
    }
    Ok(())
}

#[test]
fn test_population_then_refinement() {
    let docs = vec![
        DataDocument::new("one.xml", "<record>1</record>"),
        DataDocument::new("two.xml", "<record>2</record>")
            .with_namespace_context(NamespaceContext::new().with_binding("ex", "urn:ex")),
    ];

    let pipeline = DiscoveryPipeline::new()
        .with_step(DiscoveryStep::custom("populate", populate))
        .with_step(DiscoveryStep::remove_grouping_nodes());
    let mapping = pipeline
        .discover_with_config(&docs, &MappingConfig::default())
        .unwrap();

    assert!(mapping.is_initialized());
    assert_eq!(mapping.len(), 2);
    assert!(mapping.entities().all(|e| e.type_name == "Record"));
    assert_eq!(mapping.relations_count(), 0);
}

#[test]
fn test_failing_population_aborts_refinement() {
    let pipeline = DiscoveryPipeline::new()
        .with_step(DiscoveryStep::custom("populate", |docs, _| {
            anyhow::ensure!(!docs.is_empty(), "no documents to discover from");
            Ok(())
        }))
        .with_step(DiscoveryStep::remove_grouping_nodes());

    let mut mapping = Mapping::new();
    mapping.add_entity(Schema::new("g", "G", "/g"));
    let err = pipeline.run(&[], &mut mapping).unwrap_err();

    assert!(format!("{err:#}").contains("no documents to discover from"));
    // Refinement never ran, so the grouping node is still there.
    assert!(mapping.contains("g"));
}
