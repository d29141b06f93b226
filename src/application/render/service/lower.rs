//! Lowering from comrak's arena tree into the owned [`Node`] union.

use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use tracing::debug;

use crate::domain::{
    ast::{CodeNode, Element, LinkNode, Node},
    slug::HeadingAnchors,
};

/// Deepest element nesting kept as structure. Content below it is folded
/// into a single text node so later tree walks stay shallow.
pub(crate) const MAX_NESTING_DEPTH: usize = 64;

/// Lower a parsed comrak document into a `Root` node. Heading anchors are
/// assigned here, so each call gets a fresh deduplication scope.
pub(crate) fn lower_document<'a>(root: &'a AstNode<'a>) -> Node {
    let mut lowering = Lowering::default();
    Node::Root(lowering.children(root))
}

#[derive(Default)]
struct Lowering {
    anchors: HeadingAnchors,
    depth: usize,
}

impl Lowering {
    fn children<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        if self.depth >= MAX_NESTING_DEPTH {
            debug!(
                target = "fenceline::render::lower",
                depth = self.depth,
                "Nesting too deep; flattening content to text"
            );
            let text = flatten_text(node);
            return if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(text)]
            };
        }

        self.depth += 1;
        let mut lowered = Vec::new();
        for child in node.children() {
            self.lower_into(child, &mut lowered);
        }
        self.depth -= 1;
        lowered
    }

    fn lower_into<'a>(&mut self, node: &'a AstNode<'a>, out: &mut Vec<Node>) {
        let data = node.data.borrow();
        let lowered: Node = match &data.value {
            NodeValue::FrontMatter(_) => return,
            NodeValue::Text(text) => Node::text(text.to_string()),
            NodeValue::SoftBreak => Node::text("\n"),
            NodeValue::LineBreak => Element::new("br").into(),
            NodeValue::ThematicBreak => Element::new("hr").into(),
            NodeValue::HtmlBlock(html) => Node::Raw(html.literal.to_string()),
            NodeValue::HtmlInline(html) => Node::Raw(html.to_string()),
            NodeValue::Code(code) => Element::new("code")
                .with_child(Node::text(code.literal.to_string()))
                .into(),
            NodeValue::CodeBlock(block) => code_node(&block.info, &block.literal).into(),
            NodeValue::Paragraph => {
                let children = self.children(node);
                if in_tight_list(node) {
                    for child in children {
                        push_merged(out, child);
                    }
                    return;
                }
                Element::new("p").with_children(children).into()
            }
            NodeValue::Heading(heading) => {
                let children = self.children(node);
                let mut element = Element::new(format!("h{}", heading.level));
                let text = Node::Root(children.clone()).text_content();
                let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if let Some(anchor) = self.anchors.anchor_for(&normalized) {
                    element.properties.insert("id".to_string(), anchor);
                }
                element.with_children(children).into()
            }
            NodeValue::BlockQuote => Element::new("blockquote")
                .with_children(self.children(node))
                .into(),
            NodeValue::List(list) => {
                let ordered = matches!(list.list_type, ListType::Ordered);
                let mut element = Element::new(if ordered { "ol" } else { "ul" });
                if ordered && list.start != 1 {
                    element
                        .properties
                        .insert("start".to_string(), list.start.to_string());
                }
                element.with_children(self.children(node)).into()
            }
            NodeValue::Item(_) => list_item(self.children(node)).into(),
            NodeValue::Emph => Element::new("em").with_children(self.children(node)).into(),
            NodeValue::Strong => Element::new("strong")
                .with_children(self.children(node))
                .into(),
            NodeValue::Strikethrough => Element::new("del")
                .with_children(self.children(node))
                .into(),
            NodeValue::Link(link) => LinkNode {
                url: link.url.to_string(),
                title: non_empty(&link.title),
                children: self.children(node),
            }
            .into(),
            NodeValue::Image(link) => {
                let alt = Node::Root(self.children(node)).text_content();
                let mut image = Element::new("img")
                    .with_property("src", link.url.to_string())
                    .with_property("alt", alt);
                if let Some(title) = non_empty(&link.title) {
                    image.properties.insert("title".to_string(), title);
                }
                image.into()
            }
            NodeValue::Table(table) => {
                let alignments = table.alignments.clone();
                self.table(node, &alignments).into()
            }
            _ => {
                for child in self.children(node) {
                    push_merged(out, child);
                }
                return;
            }
        };

        push_merged(out, lowered);
    }

    fn table<'a>(&mut self, node: &'a AstNode<'a>, alignments: &[TableAlignment]) -> Element {
        let mut head = Element::new("thead");
        let mut body = Element::new("tbody");

        for row in node.children() {
            let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
            let cell_tag = if header { "th" } else { "td" };
            let mut tr = Element::new("tr");

            for (index, cell) in row.children().enumerate() {
                let mut element = Element::new(cell_tag).with_children(self.children(cell));
                if let Some(align) = alignments.get(index).and_then(alignment_name) {
                    element.properties.insert("align".to_string(), align.to_string());
                }
                tr.children.push(element.into());
            }

            if header {
                head.children.push(tr.into());
            } else {
                body.children.push(tr.into());
            }
        }

        let mut table = Element::new("table").with_child(head);
        if !body.children.is_empty() {
            table.children.push(body.into());
        }
        table
    }
}

/// Fenced info string `lang meta…` and literal into a code node. The final
/// newline comrak keeps on every block literal is dropped.
fn code_node(info: &str, literal: &str) -> CodeNode {
    let info = info.trim();
    let (lang, meta) = match info.split_once(char::is_whitespace) {
        Some((lang, meta)) => (lang, meta.trim()),
        None => (info, ""),
    };

    let value = literal.strip_suffix('\n').unwrap_or(literal);
    let value = value.strip_suffix('\r').unwrap_or(value);

    CodeNode {
        lang: non_empty(lang),
        meta: non_empty(meta),
        value: value.to_string(),
    }
}

/// Literal text below `node`, collected without recursion.
fn flatten_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants().skip(1) {
        match &descendant.data.borrow().value {
            NodeValue::Text(literal) => text.push_str(literal),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::CodeBlock(block) => text.push_str(&block.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// `li`, promoted to a task item when its text opens with `[ ]` or `[x]`.
fn list_item(mut children: Vec<Node>) -> Element {
    let Some(checked) = take_task_marker(&mut children) else {
        return Element::new("li").with_children(children);
    };

    let mut checkbox = Element::new("input")
        .with_property("type", "checkbox")
        .with_property("disabled", "");
    if checked {
        checkbox.properties.insert("checked".to_string(), String::new());
    }

    match children.first_mut() {
        Some(Node::Element(paragraph)) if paragraph.tag_name == "p" => {
            paragraph.children.insert(0, checkbox.into());
        }
        _ => children.insert(0, checkbox.into()),
    }

    Element::new("li")
        .with_property("class", "task-list-item")
        .with_children(children)
}

fn take_task_marker(children: &mut [Node]) -> Option<bool> {
    let text = match children.first_mut()? {
        Node::Text(text) => text,
        Node::Element(paragraph) if paragraph.tag_name == "p" => match paragraph.children.first_mut()? {
            Node::Text(text) => text,
            _ => return None,
        },
        _ => return None,
    };

    let checked = match text.get(..3)? {
        "[ ]" => false,
        "[x]" | "[X]" => true,
        _ => return None,
    };
    let rest = &text[3..];
    if !(rest.is_empty() || rest.starts_with([' ', '\t', '\n'])) {
        return None;
    }

    *text = rest.to_string();
    Some(checked)
}

fn in_tight_list<'a>(paragraph: &'a AstNode<'a>) -> bool {
    paragraph
        .parent()
        .and_then(|item| item.parent())
        .is_some_and(|list| matches!(&list.data.borrow().value, NodeValue::List(list) if list.tight))
}

fn alignment_name(alignment: &TableAlignment) -> Option<&'static str> {
    match alignment {
        TableAlignment::Left => Some("left"),
        TableAlignment::Center => Some("center"),
        TableAlignment::Right => Some("right"),
        TableAlignment::None => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Append `node`, folding it into a preceding text node when both are text.
fn push_merged(out: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Text(previous)), Node::Text(next)) = (out.last_mut(), &node) {
        previous.push_str(next);
        return;
    }
    out.push(node);
}
