//! Source documents handed to every discovery step.

use schemata_mapping::NamespaceContext;
use serde::{Deserialize, Serialize};

/// One semi-structured input document.
///
/// Steps receive the collection as `&[DataDocument]`; parsing `body` into
/// structural observations is the business of the steps that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDocument {
    /// Where the document came from (file path, URL, ...).
    pub source: String,
    /// Namespace bindings declared by the document.
    #[serde(default)]
    pub namespace_context: NamespaceContext,
    pub body: String,
}

impl DataDocument {
    pub fn new(source: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            namespace_context: NamespaceContext::new(),
            body: body.into(),
        }
    }

    pub fn with_namespace_context(mut self, context: NamespaceContext) -> Self {
        self.namespace_context = context;
        self
    }
}
