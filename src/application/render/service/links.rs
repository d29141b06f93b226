use std::{fmt, sync::Arc};

use tracing::debug;
use url::{ParseError, Url};

use crate::domain::ast::Node;

use super::pipeline::{Transform, Visit};

/// Maps a relative link target to its final URL.
pub type LinkResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Cleans up relative links: drops a trailing source extension
/// (`guide/intro.md` → `guide/intro`) and then runs the resolver, if any.
/// Absolute, protocol-relative and in-page anchor links are never touched.
pub struct LinkRewriter {
    resolver: Option<LinkResolver>,
    strip_extensions: Vec<String>,
}

impl LinkRewriter {
    pub fn new(resolver: Option<LinkResolver>, strip_extensions: Vec<String>) -> Self {
        Self {
            resolver,
            strip_extensions,
        }
    }

    fn rewrite(&self, url: &str) -> Option<String> {
        if !is_relative(url) {
            return None;
        }

        let stripped = strip_extension(url, &self.strip_extensions);
        let rewritten = match &self.resolver {
            Some(resolver) => resolver(&stripped),
            None => stripped,
        };

        (rewritten != url).then_some(rewritten)
    }
}

impl fmt::Debug for LinkRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkRewriter")
            .field("resolver", &self.resolver.is_some())
            .field("strip_extensions", &self.strip_extensions)
            .finish()
    }
}

impl Transform for LinkRewriter {
    fn name(&self) -> &'static str {
        "link-rewriter"
    }

    fn visit(&self, node: &mut Node) -> Visit {
        let Node::Link(link) = node else {
            return Visit::Unchanged;
        };

        match self.rewrite(&link.url) {
            Some(rewritten) => {
                debug!(
                    target = "fenceline::render::links",
                    from = %link.url,
                    to = %rewritten,
                    "Rewrote relative link"
                );
                link.url = rewritten;
                Visit::Mutated
            }
            None => Visit::Unchanged,
        }
    }
}

/// Resolver that places relative links under `base`. An absolute base URL is
/// joined per RFC 3986; anything else is treated as a path prefix.
pub fn prefix_resolver(base: &str) -> LinkResolver {
    match Url::parse(base) {
        Ok(mut base_url) => {
            if !base_url.path().ends_with('/') {
                let path = format!("{}/", base_url.path());
                base_url.set_path(&path);
            }
            Arc::new(move |relative: &str| {
                base_url
                    .join(relative)
                    .map(String::from)
                    .unwrap_or_else(|_| relative.to_string())
            })
        }
        Err(_) => {
            let prefix = base.trim_end_matches('/').to_string();
            Arc::new(move |relative: &str| {
                let relative = relative.trim_start_matches("./");
                if relative.starts_with('/') {
                    format!("{prefix}{relative}")
                } else {
                    format!("{prefix}/{relative}")
                }
            })
        }
    }
}

fn is_relative(url: &str) -> bool {
    if url.is_empty() || url.starts_with('#') || url.starts_with("//") {
        return false;
    }
    matches!(Url::parse(url), Err(ParseError::RelativeUrlWithoutBase))
}

/// Remove the first matching extension from the path part of `url`, keeping
/// any query or fragment.
fn strip_extension(url: &str, extensions: &[String]) -> String {
    let split_at = url.find(['?', '#']).unwrap_or(url.len());
    let (path, suffix) = url.split_at(split_at);

    let stripped = extensions
        .iter()
        .filter(|extension| !extension.is_empty())
        .find_map(|extension| {
            let cut = path.len().checked_sub(extension.len())?;
            let candidate = path.get(cut..)?;
            candidate
                .eq_ignore_ascii_case(extension)
                .then(|| &path[..cut])
        })
        .filter(|rest| !rest.is_empty() && !rest.ends_with('/'))
        .unwrap_or(path);

    format!("{stripped}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::LinkNode;

    fn extensions() -> Vec<String> {
        vec![".md".to_string(), ".mdx".to_string()]
    }

    fn link(url: &str) -> Node {
        Node::Link(LinkNode {
            url: url.to_string(),
            title: None,
            children: vec![Node::text("label")],
        })
    }

    fn rewritten(rewriter: &LinkRewriter, url: &str) -> String {
        let mut node = link(url);
        rewriter.visit(&mut node);
        match node {
            Node::Link(link) => link.url,
            other => panic!("link replaced by {other:?}"),
        }
    }

    #[test]
    fn strips_source_extensions_from_relative_links() {
        let rewriter = LinkRewriter::new(None, extensions());

        assert_eq!(rewritten(&rewriter, "guide/intro.md"), "guide/intro");
        assert_eq!(rewritten(&rewriter, "../api.MDX#usage"), "../api#usage");
        assert_eq!(rewritten(&rewriter, "setup.md?tab=linux"), "setup?tab=linux");
        assert_eq!(rewritten(&rewriter, "notes.txt"), "notes.txt");
        assert_eq!(rewritten(&rewriter, "docs/.md"), "docs/.md");
    }

    #[test]
    fn absolute_and_anchor_links_pass_through() {
        let resolver: LinkResolver = Arc::new(|url| format!("/base/{url}"));
        let rewriter = LinkRewriter::new(Some(resolver), extensions());

        for url in [
            "https://example.com/readme.md",
            "mailto:team@example.com",
            "//cdn.example.com/file.md",
            "#section",
            "",
        ] {
            let mut node = link(url);
            assert_eq!(rewriter.visit(&mut node), Visit::Unchanged, "{url}");
        }
    }

    #[test]
    fn resolver_runs_after_extension_stripping() {
        let resolver: LinkResolver = Arc::new(|url| format!("/docs/{url}"));
        let rewriter = LinkRewriter::new(Some(resolver), extensions());

        let mut node = link("getting-started.md");
        assert_eq!(rewriter.visit(&mut node), Visit::Mutated);
        assert_eq!(rewritten(&rewriter, "getting-started.md"), "/docs/getting-started");
    }

    #[test]
    fn non_link_nodes_are_ignored() {
        let rewriter = LinkRewriter::new(None, extensions());
        let mut node = Node::text("intro.md");
        assert_eq!(rewriter.visit(&mut node), Visit::Unchanged);
    }

    #[test]
    fn prefix_resolver_joins_absolute_bases() {
        let resolver = prefix_resolver("https://docs.example.com/v2");
        assert_eq!(resolver("intro"), "https://docs.example.com/v2/intro");
        assert_eq!(resolver("../v1/intro"), "https://docs.example.com/v1/intro");
    }

    #[test]
    fn prefix_resolver_concatenates_path_bases() {
        let resolver = prefix_resolver("/docs/");
        assert_eq!(resolver("intro"), "/docs/intro");
        assert_eq!(resolver("./guide/setup"), "/docs/guide/setup");
        assert_eq!(resolver("/abs"), "/docs/abs");
    }
}
