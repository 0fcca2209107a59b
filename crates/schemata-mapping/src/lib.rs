//! Schema graph model for schemata discovery.
//!
//! A [`Mapping`] holds the entities ([`Schema`]) discovered in a document
//! collection, their attributes, and the [`Relation`]s between them:
//!
//! ```text
//!   Mapping ──► slots: [Some(Schema), None (removed), Some(Schema), ...]
//!      │                   │
//!      │                   ├── attributes: name → Attribute
//!      │                   └── relations:  [Relation { subject, object, .. }]
//!      └──► index: xml type → EntityId (slot)
//! ```
//!
//! Discovery steps mutate the mapping in place. Removing entities during a
//! traversal goes through [`EntityCursor`]; relations left dangling by a
//! removal are pruned by [`Mapping::remove_invalid_relations`].
//!
//! The [`xml`] module reads and writes the mapping description format whose
//! names are fixed by [`MappingVocabulary`].

pub mod config;
pub mod mapping;
pub mod namespace;
pub mod relation;
pub mod schema;
pub mod vocabulary;
pub mod xml;

pub use config::{MappingConfig, DEFAULT_NAMESPACE_URI, DEFAULT_TAG_NAME_PREFIX};
pub use mapping::{EntityCursor, Mapping};
pub use namespace::NamespaceContext;
pub use relation::{EntityId, Relation, RelationReference};
pub use schema::{Attribute, RelationCursor, Schema};
pub use vocabulary::MappingVocabulary;
pub use xml::{read_mapping, write_mapping, MappingXmlError};
