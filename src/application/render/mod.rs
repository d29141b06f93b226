//! Markdown rendering service.
//!
//! The rendering pipeline is intentionally kept pure: it accepts markdown input,
//! produces deterministic HTML output, and surfaces structured errors. Reading
//! and writing files happens in the caller.

mod service;
mod types;

pub use service::{
    CodeHighlighter, ColorMode, Highlighter, HighlighterError, HtmlSerializer, LinkResolver,
    LinkRewriter, MarkdownRenderService, Pipeline, PipelineReport, RenderConfigError,
    RenderPipelineConfig, ThemeColorTable, ThemeSource, Transform, Visit, default_palette_css,
    init_render_service, prefix_resolver, render, render_service,
};
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService};
