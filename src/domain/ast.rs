//! Closed document tree the render pipeline operates on.
//!
//! Markdown is parsed by comrak and immediately lowered into [`Node`]. Every
//! transform and the HTML serializer pattern-match on this union, so adding a
//! variant forces each consumer to decide how to treat it. Each node owns its
//! children outright; there are no parent links and no sharing between trees.

use indexmap::IndexMap;

/// Ordered attribute map attached to [`Element`] nodes. An empty value is
/// serialized as a bare attribute (`<pre data-code-block>`).
pub type Properties = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Document root holding the top-level blocks.
    Root(Vec<Node>),
    /// Literal text, escaped on output.
    Text(String),
    /// Raw HTML carried through from the source, emitted verbatim and left to
    /// the sanitiser.
    Raw(String),
    Link(LinkNode),
    Code(CodeNode),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    pub url: String,
    pub title: Option<String>,
    pub children: Vec<Node>,
}

/// Code block as written in the source: fence language tag, the raw trailing
/// meta string, and the code without its final newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeNode {
    pub lang: Option<String>,
    pub meta: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag_name: String,
    pub properties: Properties,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            properties: Properties::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    /// Child list for container variants; leaves return an empty slice.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(children) => children,
            Node::Link(link) => &link.children,
            Node::Element(element) => &element.children,
            Node::Text(_) | Node::Raw(_) | Node::Code(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root(children) => Some(children),
            Node::Link(link) => Some(&mut link.children),
            Node::Element(element) => Some(&mut element.children),
            Node::Text(_) | Node::Raw(_) | Node::Code(_) => None,
        }
    }

    /// Concatenated text of this subtree, ignoring markup.
    pub fn text_content(&self) -> String {
        let mut buffer = String::new();
        self.collect_text(&mut buffer);
        buffer
    }

    fn collect_text(&self, buffer: &mut String) {
        match self {
            Node::Text(text) => buffer.push_str(text),
            Node::Code(code) => buffer.push_str(&code.value),
            Node::Raw(_) => {}
            Node::Root(_) | Node::Link(_) | Node::Element(_) => {
                for child in self.children() {
                    child.collect_text(buffer);
                }
            }
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<LinkNode> for Node {
    fn from(link: LinkNode) -> Self {
        Node::Link(link)
    }
}

impl From<CodeNode> for Node {
    fn from(code: CodeNode) -> Self {
        Node::Code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_walks_nested_children() {
        let tree = Node::Root(vec![
            Element::new("p")
                .with_child(Node::text("Read "))
                .with_child(LinkNode {
                    url: "/guide".to_string(),
                    title: None,
                    children: vec![Node::text("the guide")],
                })
                .into(),
            Node::Raw("<br>".to_string()),
        ]);

        assert_eq!(tree.text_content(), "Read the guide");
    }

    #[test]
    fn leaves_have_no_mutable_children() {
        let mut code = Node::Code(CodeNode {
            lang: None,
            meta: None,
            value: "x".to_string(),
        });
        assert!(code.children_mut().is_none());
        assert!(code.children().is_empty());
    }
}
