//! Construction settings for a [`crate::Mapping`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE_URI: &str = "urn:schemata:mapping";
pub const DEFAULT_TAG_NAME_PREFIX: &str = "schemata";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    /// Namespace URI bound to the mapping description's elements.
    pub namespace_uri: String,
    /// Prefix used for the mapping description's element names.
    pub tag_name_prefix: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            tag_name_prefix: DEFAULT_TAG_NAME_PREFIX.to_string(),
        }
    }
}

impl MappingConfig {
    /// Parse a config from JSON; missing fields fall back to the defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Partial {
            namespace_uri: Option<String>,
            tag_name_prefix: Option<String>,
        }

        let partial: Partial = serde_json::from_str(text)?;
        let defaults = Self::default();
        Ok(Self {
            namespace_uri: partial.namespace_uri.unwrap_or(defaults.namespace_uri),
            tag_name_prefix: partial.tag_name_prefix.unwrap_or(defaults.tag_name_prefix),
        })
    }
}
