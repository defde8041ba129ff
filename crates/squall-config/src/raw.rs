use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw YAML representation of a collection config file
/// (`collections/<collection>/<vendor>.yaml`).
#[derive(Debug, Deserialize, Serialize)]
pub struct RawCollection {
    pub command: String,
    /// Polling interval in seconds; absent means the per-collection default.
    pub interval: Option<u64>,
    #[serde(default)]
    pub parsers: Vec<RawParser>,
    /// canonical field → parser-produced field.
    #[serde(default)]
    pub normalize: HashMap<String, String>,
}

/// One entry of the `parsers:` list. Which fields are meaningful depends on
/// `type`: template parsers use `templates`, the regex parser uses
/// `pattern`/`flags`/`groups`.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawParser {
    #[serde(rename = "type")]
    pub parser_type: String,
    #[serde(default)]
    pub templates: Vec<String>,
    pub pattern: Option<String>,
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub groups: HashMap<String, usize>,
}

/// Raw YAML representation of a collection's sibling `_schema.yaml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawSchema {
    #[serde(default)]
    pub fields: HashMap<String, RawField>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: Option<String>,
}
