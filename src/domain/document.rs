use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flat frontmatter metadata in source order.
pub type Attributes = IndexMap<String, String>;

/// A document passing through the pipeline. `attributes` is empty, never
/// absent, when the source has no frontmatter block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub attributes: Attributes,
    pub body: String,
    pub html: String,
}
