use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::Attributes;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Raw document text, optionally opening with a `---` metadata block.
    pub markdown: String,
    /// Where the document came from, used only to label log events.
    #[serde(default)]
    pub source: Option<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or("<inline>")
    }
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Frontmatter attributes in source order; empty when the document has none.
    pub attributes: Attributes,
    /// Rendered (and, unless disabled, sanitised) HTML.
    pub html: String,
}

/// Structured errors surfaced by the rendering pipeline. Malformed content
/// never ends up here; it degrades to plainer HTML instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("document is {size} bytes, above the configured limit of {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
