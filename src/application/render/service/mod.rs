mod code_block;
mod colors;
mod config;
mod frontmatter;
mod highlight;
mod links;
mod lower;
mod meta;
mod pipeline;
mod serialize;

use std::{fmt, num::NonZeroUsize, sync::Arc};

use comrak::{Arena, parse_document};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::render::types::{
    RenderError, RenderOutput, RenderRequest, RenderService,
};
use crate::domain::{ast::Node, document::Attributes, document::Document};

pub use code_block::CodeHighlighter;
pub use colors::{ColorMode, ThemeColorTable, default_palette_css};
pub use highlight::{Highlighter, HighlighterError, ThemeSource};
pub use links::{LinkResolver, LinkRewriter, prefix_resolver};
pub use pipeline::{Pipeline, PipelineReport, Transform, Visit};
pub use serialize::HtmlSerializer;

use config::{build_sanitizer, default_options};
use frontmatter::split_frontmatter;
use lower::lower_document;

/// Markdown pipeline: frontmatter split, comrak parse, lowering into
/// [`Node`], link rewriting and code highlighting, HTML serialisation and
/// Ammonia sanitisation.
pub struct MarkdownRenderService {
    options: comrak::Options<'static>,
    pipeline: Pipeline,
    highlighter: Arc<Highlighter>,
    sanitizer: ammonia::Builder<'static>,
    color_mode: ColorMode,
    sanitize: bool,
    max_document_bytes: Option<NonZeroUsize>,
}

/// Everything a [`MarkdownRenderService`] is built from.
#[derive(Clone)]
pub struct RenderPipelineConfig {
    pub theme: ThemeSource,
    pub color_mode: ColorMode,
    pub sanitize: bool,
    pub link_resolver: Option<LinkResolver>,
    pub strip_extensions: Vec<String>,
    pub max_document_bytes: Option<NonZeroUsize>,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self::from(&crate::config::RenderSettings::default())
    }
}

impl fmt::Debug for RenderPipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPipelineConfig")
            .field("theme", &self.theme)
            .field("color_mode", &self.color_mode)
            .field("sanitize", &self.sanitize)
            .field("link_resolver", &self.link_resolver.is_some())
            .field("strip_extensions", &self.strip_extensions)
            .field("max_document_bytes", &self.max_document_bytes)
            .finish()
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            theme: settings
                .theme_path
                .clone()
                .map_or(ThemeSource::Placeholder, ThemeSource::File),
            color_mode: settings.color_mode,
            sanitize: settings.sanitize,
            link_resolver: settings.link_base.as_deref().map(prefix_resolver),
            strip_extensions: settings.strip_extensions.clone(),
            max_document_bytes: settings.max_document_bytes,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
    #[error(transparent)]
    Highlighter(#[from] HighlighterError),
}

impl MarkdownRenderService {
    /// Build a service for `config`. Fails only when a theme file cannot be
    /// loaded; the built-in theme reuses the shared highlighter.
    pub fn new(config: RenderPipelineConfig) -> Result<Self, RenderConfigError> {
        let highlighter = match &config.theme {
            ThemeSource::Placeholder => Highlighter::shared(),
            source @ ThemeSource::File(_) => Arc::new(Highlighter::new(source)?),
        };
        Ok(Self::assemble(config, highlighter))
    }

    fn assemble(config: RenderPipelineConfig, highlighter: Arc<Highlighter>) -> Self {
        let pipeline = Pipeline::new()
            .with(LinkRewriter::new(
                config.link_resolver,
                config.strip_extensions,
            ))
            .with(CodeHighlighter::new(Arc::clone(&highlighter)));

        Self {
            options: default_options(),
            pipeline,
            highlighter,
            sanitizer: build_sanitizer(),
            color_mode: config.color_mode,
            sanitize: config.sanitize,
            max_document_bytes: config.max_document_bytes,
        }
    }

    pub fn colors(&self) -> &ThemeColorTable {
        self.highlighter.colors()
    }

    /// Render markdown into HTML while skipping the sanitisation stage. This is
    /// intended for diagnostics when refining sanitizer rules.
    pub fn render_unsanitized(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.check_size(request)?;
        let (_, _, html) = self.render_stages(&request.markdown, request.source_label());
        Ok(html)
    }

    /// Render raw text into a [`Document`] carrying the split-off body
    /// alongside the attributes and HTML.
    pub fn render_document(&self, input: &str) -> Result<Document, RenderError> {
        let request = RenderRequest::new(input);
        self.check_size(&request)?;
        let (attributes, body, html) = self.render_stages(input, request.source_label());

        Ok(Document {
            attributes,
            body: body.to_string(),
            html: self.sanitize_stage(html),
        })
    }

    fn check_size(&self, request: &RenderRequest) -> Result<(), RenderError> {
        let Some(limit) = self.max_document_bytes else {
            return Ok(());
        };

        let size = request.markdown.len();
        if size > limit.get() {
            warn!(
                target = "fenceline::render",
                source = request.source_label(),
                size,
                limit = limit.get(),
                "Document exceeds size limit"
            );
            return Err(RenderError::TooLarge {
                size,
                limit: limit.get(),
            });
        }

        Ok(())
    }

    fn render_stages<'a>(&self, input: &'a str, source: &str) -> (Attributes, &'a str, String) {
        let frontmatter = split_frontmatter(input);
        let mut tree = self.parse_stage(frontmatter.body);
        self.transform_stage(&mut tree, source);
        let html = self.serialize_stage(&tree);
        (frontmatter.attributes, frontmatter.body, html)
    }

    fn parse_stage(&self, body: &str) -> Node {
        let arena = Arena::new();
        let root = parse_document(&arena, body, &self.options);
        lower_document(root)
    }

    fn transform_stage(&self, tree: &mut Node, source: &str) {
        let report = self.pipeline.run(tree);
        debug!(
            target = "fenceline::render::pipeline",
            source,
            visited = report.visited,
            mutated = report.mutated,
            replaced = report.replaced,
            "Transform pipeline finished"
        );
    }

    fn serialize_stage(&self, tree: &Node) -> String {
        HtmlSerializer::new(self.highlighter.colors(), self.color_mode).serialize(tree)
    }

    fn sanitize_stage(&self, html: String) -> String {
        if self.sanitize {
            self.sanitizer.clean(&html).to_string()
        } else {
            html
        }
    }
}

impl RenderService for MarkdownRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        self.check_size(request)?;
        let (attributes, _, html) = self.render_stages(&request.markdown, request.source_label());

        Ok(RenderOutput {
            attributes,
            html: self.sanitize_stage(html),
        })
    }
}

static RENDER_SERVICE: OnceCell<Arc<MarkdownRenderService>> = OnceCell::new();

/// Build the process-wide service from `config`. Must run before the first
/// [`render_service`] call; afterwards the shared instance is fixed.
pub fn init_render_service(
    config: RenderPipelineConfig,
) -> Result<Arc<MarkdownRenderService>, RenderConfigError> {
    let service = Arc::new(MarkdownRenderService::new(config)?);
    RENDER_SERVICE
        .set(Arc::clone(&service))
        .map_err(|_| RenderConfigError::AlreadyConfigured)?;
    Ok(service)
}

/// Access the shared render service instance, initialised with defaults on
/// first use unless [`init_render_service`] ran earlier.
pub fn render_service() -> Arc<MarkdownRenderService> {
    Arc::clone(RENDER_SERVICE.get_or_init(|| {
        Arc::new(MarkdownRenderService::assemble(
            RenderPipelineConfig::default(),
            Highlighter::shared(),
        ))
    }))
}

/// Render one document through the shared service.
pub fn render(document: &str) -> Result<RenderOutput, RenderError> {
    render_service().render(&RenderRequest::new(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(config: RenderPipelineConfig) -> MarkdownRenderService {
        MarkdownRenderService::new(config).expect("service builds")
    }

    #[test]
    fn frontmatter_attributes_are_returned_and_stripped_from_body() {
        let output = service(RenderPipelineConfig::default())
            .render(&RenderRequest::new("---\ntitle: Intro\n---\n# Hello\n"))
            .expect("render");

        assert_eq!(output.attributes.get("title").map(String::as_str), Some("Intro"));
        assert!(output.html.contains("<h1 id=\"hello\">Hello</h1>"));
        assert!(!output.html.contains("title: Intro"));
    }

    #[test]
    fn render_document_keeps_the_body() {
        let input = "# Plain\n\ntext\n";
        let document = service(RenderPipelineConfig::default())
            .render_document(input)
            .expect("render");

        assert!(document.attributes.is_empty());
        assert_eq!(document.body, input);
        assert!(document.html.contains("<p>text</p>"));
    }

    #[test]
    fn size_limit_is_enforced() {
        let config = RenderPipelineConfig {
            max_document_bytes: NonZeroUsize::new(8),
            ..RenderPipelineConfig::default()
        };

        let err = service(config)
            .render(&RenderRequest::new("# far too long"))
            .expect_err("over limit");
        assert_eq!(err, RenderError::TooLarge { size: 14, limit: 8 });
    }

    #[test]
    fn unsanitized_output_keeps_raw_html() {
        let service = service(RenderPipelineConfig::default());
        let request = RenderRequest::new("<script>alert(1)</script>\n\ntext\n");

        let raw = service.render_unsanitized(&request).expect("render");
        let clean = service.render(&request).expect("render").html;

        assert!(raw.contains("<script>"));
        assert!(!clean.contains("<script>"));
        assert!(clean.contains("<p>text</p>"));
    }

    #[test]
    fn links_are_rewritten_through_the_configured_resolver() {
        let config = RenderPipelineConfig {
            link_resolver: Some(prefix_resolver("/docs")),
            ..RenderPipelineConfig::default()
        };

        let html = service(config)
            .render(&RenderRequest::new(
                "[setup](guide/setup.md) [site](https://example.com/a.md) [top](#top)\n",
            ))
            .expect("render")
            .html;

        assert!(html.contains("href=\"/docs/guide/setup\""));
        assert!(html.contains("href=\"https://example.com/a.md\""));
        assert!(html.contains("href=\"#top\""));
    }

    #[test]
    fn missing_theme_file_fails_construction() {
        let config = RenderPipelineConfig {
            theme: ThemeSource::File("/nonexistent/theme.tmTheme".into()),
            ..RenderPipelineConfig::default()
        };

        assert!(matches!(
            MarkdownRenderService::new(config),
            Err(RenderConfigError::Highlighter(HighlighterError::ThemeLoad { .. }))
        ));
    }

    #[test]
    fn default_config_matches_default_settings() {
        let config = RenderPipelineConfig::default();

        assert_eq!(config.theme, ThemeSource::Placeholder);
        assert!(config.sanitize);
        assert!(config.link_resolver.is_none());
        assert_eq!(config.strip_extensions, vec![".md", ".mdx"]);
    }
}
