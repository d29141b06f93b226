use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    ast::{CodeNode, Element, Node},
    code::{CodeBlockMeta, HighlightedLine, Language},
};

use super::{
    colors::ThemeColorTable,
    highlight::Highlighter,
    meta::parse_meta,
    pipeline::{Transform, Visit},
};

/// Replaces fenced code in a supported language with a highlighted
/// `pre > code > span` tree. Other code nodes are left for the serializer's
/// plain-text path.
pub struct CodeHighlighter {
    highlighter: Arc<Highlighter>,
}

impl CodeHighlighter {
    pub fn new(highlighter: Arc<Highlighter>) -> Self {
        Self { highlighter }
    }

    fn render(&self, code: &CodeNode, tag: &str, language: Language) -> Node {
        let meta = parse_meta(code.meta.as_deref());
        let lines = self.highlighter.highlight(&code.value, language);
        code_block_element(tag, &meta, &lines, self.highlighter.colors()).into()
    }
}

impl Transform for CodeHighlighter {
    fn name(&self) -> &'static str {
        "code-highlighter"
    }

    fn visit(&self, node: &mut Node) -> Visit {
        let Node::Code(code) = node else {
            return Visit::Unchanged;
        };
        let Some(tag) = code.lang.as_deref() else {
            return Visit::Unchanged;
        };
        let Some(language) = Language::from_tag(tag) else {
            debug!(
                target = "fenceline::render::code",
                language = tag,
                "Unsupported language; leaving code block unhighlighted"
            );
            return Visit::Unchanged;
        };

        let tag = tag.to_ascii_lowercase();
        Visit::Replaced(self.render(code, &tag, language))
    }
}

/// Build the block markup for already tokenized lines.
pub(crate) fn code_block_element(
    tag: &str,
    meta: &CodeBlockMeta,
    lines: &[HighlightedLine],
    colors: &ThemeColorTable,
) -> Element {
    let mut pre = Element::new("pre")
        .with_property("data-code-block", "")
        .with_property("data-lang", tag)
        .with_property("data-line-numbers", meta.uses_line_numbers.to_string());

    for (name, value) in &meta.passthrough_attributes {
        if pre.properties.contains_key(name) {
            continue;
        }
        pre.properties.insert(name.clone(), value.clone());
    }

    let foreground = colors.to_symbolic(colors.foreground());
    let mut diff_line_number = meta.starting_line_number.saturating_sub(1);
    let mut code = Element::new("code");

    for (index, tokens) in lines.iter().enumerate() {
        let line_number = meta
            .starting_line_number
            .saturating_add(u32::try_from(index).unwrap_or(u32::MAX));
        let removed = meta.removed_lines.contains(&line_number);
        if !removed {
            diff_line_number = diff_line_number.saturating_add(1);
        }

        let mut line = Element::new("span");
        if meta.uses_line_numbers {
            line.properties
                .insert("data-line-number".to_string(), line_number.to_string());
        }
        if meta.highlight_lines.contains(&line_number) {
            line.properties
                .insert("data-highlight".to_string(), "true".to_string());
        }
        if meta.added_lines.contains(&line_number) {
            line.properties
                .insert("data-add".to_string(), "true".to_string());
        }
        if removed {
            line.properties
                .insert("data-remove".to_string(), "true".to_string());
        }
        line.properties.insert(
            "data-diff-line-number".to_string(),
            diff_line_number.to_string(),
        );

        for token in tokens {
            let color = token
                .color
                .as_deref()
                .map(|color| colors.to_symbolic(color))
                .filter(|color| *color != foreground);
            line.children.push(match color {
                Some(color) => Element::new("span")
                    .with_property("style", format!("color: {color}"))
                    .with_child(Node::text(token.text.clone()))
                    .into(),
                None => Node::text(token.text.clone()),
            });
        }
        line.children.push(Node::text("\n"));
        code.children.push(line.into());
    }

    pre.with_child(code)
}
