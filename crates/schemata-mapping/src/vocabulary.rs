//! Element and attribute names of the mapping description format.
//!
//! The population step and the emission step must agree on these names when
//! a mapping is persisted; [`MappingVocabulary`] is the one place they live.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingVocabulary {
    /// Prefix bound to the mapping namespace URI (`prefix:tag`).
    pub prefix: String,

    pub mapping_tag: &'static str,
    pub entity_tag: &'static str,
    pub attribute_tag: &'static str,
    pub relation_tag: &'static str,
    pub reference_tag: &'static str,
    pub id_tag: &'static str,

    pub key_attr: &'static str,
    pub name_attr: &'static str,
    pub xml_type_attr: &'static str,
    pub type_attr: &'static str,
    pub path_attr: &'static str,
    pub target_entity_xml_type_attr: &'static str,
    pub reference_path_attr: &'static str,
    pub reference_target_path_attr: &'static str,
}

impl MappingVocabulary {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            mapping_tag: "mapping",
            entity_tag: "entity",
            attribute_tag: "attribute",
            relation_tag: "relation",
            reference_tag: "reference",
            id_tag: "id",
            key_attr: "key",
            name_attr: "name",
            xml_type_attr: "xmlType",
            type_attr: "type",
            path_attr: "path",
            target_entity_xml_type_attr: "targetEntityXmlType",
            reference_path_attr: "path",
            reference_target_path_attr: "targetPath",
        }
    }

    /// Qualified element name, `prefix:tag`.
    pub fn node_name(&self, tag: &str) -> String {
        format!("{}:{}", self.prefix, tag)
    }

    pub fn mapping_node_name(&self) -> String {
        self.node_name(self.mapping_tag)
    }

    pub fn entity_node_name(&self) -> String {
        self.node_name(self.entity_tag)
    }

    pub fn attribute_node_name(&self) -> String {
        self.node_name(self.attribute_tag)
    }

    pub fn relation_node_name(&self) -> String {
        self.node_name(self.relation_tag)
    }

    pub fn reference_node_name(&self) -> String {
        self.node_name(self.reference_tag)
    }

    pub fn id_node_name(&self) -> String {
        self.node_name(self.id_tag)
    }

    /// `xmlns:prefix`, the attribute declaring the mapping namespace.
    pub fn namespace_declaration(&self) -> String {
        format!("xmlns:{}", self.prefix)
    }
}
