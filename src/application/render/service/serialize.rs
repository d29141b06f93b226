use crate::domain::ast::{CodeNode, Element, LinkNode, Node};

use super::colors::{ColorMode, ThemeColorTable};

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

/// Block-level tags followed by a newline in the output, for readable HTML.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "ul",
    "ol",
    "li",
    "pre",
    "hr",
    "table",
    "thead",
    "tbody",
    "tr",
];

/// Writes a [`Node`] tree as HTML. `style` attributes have their colors
/// resolved for the configured [`ColorMode`]; everything else is emitted as
/// stored, with text and attribute values escaped.
pub struct HtmlSerializer<'a> {
    colors: &'a ThemeColorTable,
    mode: ColorMode,
}

impl<'a> HtmlSerializer<'a> {
    pub fn new(colors: &'a ThemeColorTable, mode: ColorMode) -> Self {
        Self { colors, mode }
    }

    pub fn serialize(&self, node: &Node) -> String {
        let mut html = String::new();
        self.write_node(node, &mut html);
        html
    }

    fn write_node(&self, node: &Node, html: &mut String) {
        match node {
            Node::Root(children) => self.write_children(children, html),
            Node::Text(text) => html.push_str(&escape_text(text)),
            Node::Raw(raw) => html.push_str(raw),
            Node::Link(link) => self.write_link(link, html),
            Node::Code(code) => write_plain_code(code, html),
            Node::Element(element) => self.write_element(element, html),
        }
    }

    fn write_children(&self, children: &[Node], html: &mut String) {
        for child in children {
            self.write_node(child, html);
        }
    }

    fn write_link(&self, link: &LinkNode, html: &mut String) {
        html.push_str("<a href=\"");
        html.push_str(&escape_attribute(&link.url));
        html.push('"');
        if let Some(title) = &link.title {
            html.push_str(" title=\"");
            html.push_str(&escape_attribute(title));
            html.push('"');
        }
        html.push('>');
        self.write_children(&link.children, html);
        html.push_str("</a>");
    }

    fn write_element(&self, element: &Element, html: &mut String) {
        html.push('<');
        html.push_str(&element.tag_name);
        for (name, value) in &element.properties {
            html.push(' ');
            html.push_str(name);
            if name == "style" {
                let resolved = self.colors.resolve_style(value, self.mode);
                html.push_str("=\"");
                html.push_str(&escape_attribute(&resolved));
                html.push('"');
            } else if !value.is_empty() {
                html.push_str("=\"");
                html.push_str(&escape_attribute(value));
                html.push('"');
            }
        }

        let tag = element.tag_name.as_str();
        if VOID_TAGS.contains(&tag) {
            html.push_str(" />");
        } else {
            html.push('>');
            self.write_children(&element.children, html);
            html.push_str("</");
            html.push_str(tag);
            html.push('>');
        }

        if BLOCK_TAGS.contains(&tag) {
            html.push('\n');
        }
    }
}

/// Code the highlighter did not claim: escaped text, no color spans.
fn write_plain_code(code: &CodeNode, html: &mut String) {
    html.push_str("<pre><code");
    if let Some(lang) = &code.lang {
        html.push_str(" class=\"language-");
        html.push_str(&escape_attribute(lang));
        html.push('"');
    }
    html.push('>');
    html.push_str(&escape_text(&code.value));
    if !code.value.is_empty() {
        html.push('\n');
    }
    html.push_str("</code></pre>\n");
}

pub(crate) fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}
