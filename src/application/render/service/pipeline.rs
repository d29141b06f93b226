//! Ordered tree-rewrite passes over the document [`Node`] tree.

use tracing::trace;

use crate::domain::ast::Node;

/// What a transform did with the node it was offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    Unchanged,
    /// The node's own fields were edited in place.
    Mutated,
    /// Swap the node for this subtree. The replacement is neither offered to
    /// later transforms nor descended into.
    Replaced(Node),
}

pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn visit(&self, node: &mut Node) -> Visit;
}

/// Counters from one pipeline run, logged per render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub visited: usize,
    pub mutated: usize,
    pub replaced: usize,
}

#[derive(Default)]
pub struct Pipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn transform_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.transforms.iter().map(|transform| transform.name())
    }

    /// Single pre-order traversal; each node is offered to every transform in
    /// order until one replaces it.
    pub fn run(&self, root: &mut Node) -> PipelineReport {
        let mut report = PipelineReport::default();
        self.visit_node(root, &mut report);
        report
    }

    fn visit_node(&self, node: &mut Node, report: &mut PipelineReport) {
        report.visited += 1;

        for transform in &self.transforms {
            match transform.visit(node) {
                Visit::Unchanged => {}
                Visit::Mutated => report.mutated += 1,
                Visit::Replaced(replacement) => {
                    trace!(
                        target = "fenceline::render::pipeline",
                        transform = transform.name(),
                        "Node replaced"
                    );
                    *node = replacement;
                    report.replaced += 1;
                    return;
                }
            }
        }

        if let Some(children) = node.children_mut() {
            for child in children.iter_mut() {
                self.visit_node(child, report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::ast::Element;

    /// Wraps every text node in `<em>`, which would loop forever if
    /// replacements were re-visited.
    struct Emphasise;

    impl Transform for Emphasise {
        fn name(&self) -> &'static str {
            "emphasise"
        }

        fn visit(&self, node: &mut Node) -> Visit {
            match node {
                Node::Text(text) => {
                    Visit::Replaced(Element::new("em").with_child(Node::text(text.clone())).into())
                }
                _ => Visit::Unchanged,
            }
        }
    }

    struct Uppercase;

    impl Transform for Uppercase {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn visit(&self, node: &mut Node) -> Visit {
            match node {
                Node::Text(text) => {
                    *text = text.to_uppercase();
                    Visit::Mutated
                }
                _ => Visit::Unchanged,
            }
        }
    }

    struct Count(AtomicUsize);

    impl Transform for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        fn visit(&self, _node: &mut Node) -> Visit {
            self.0.fetch_add(1, Ordering::Relaxed);
            Visit::Unchanged
        }
    }

    fn sample() -> Node {
        Node::Root(vec![
            Element::new("p")
                .with_child(Node::text("one"))
                .with_child(Node::text("two"))
                .into(),
        ])
    }

    #[test]
    fn replacements_are_not_revisited() {
        let mut tree = sample();
        let report = Pipeline::new().with(Emphasise).run(&mut tree);

        assert_eq!(report.replaced, 2);
        assert_eq!(report.visited, 4);
        let paragraph = tree.children()[0].as_element().expect("paragraph");
        for child in &paragraph.children {
            let em = child.as_element().expect("wrapped text");
            assert_eq!(em.tag_name, "em");
            assert!(matches!(em.children[0], Node::Text(_)));
        }
    }

    #[test]
    fn transforms_run_in_order_and_replacement_stops_later_ones() {
        let mut tree = sample();
        let report = Pipeline::new().with(Uppercase).with(Emphasise).run(&mut tree);

        assert_eq!(report.mutated, 2);
        assert_eq!(tree.text_content(), "ONETWO");

        let mut tree = sample();
        Pipeline::new().with(Emphasise).with(Uppercase).run(&mut tree);
        assert_eq!(tree.text_content(), "onetwo");
    }

    #[test]
    fn every_node_is_offered_once() {
        let mut tree = sample();
        let pipeline = Pipeline::new().with(Count(AtomicUsize::new(0)));
        let report = pipeline.run(&mut tree);

        assert_eq!(report.visited, 4);
        assert_eq!(report, PipelineReport { visited: 4, mutated: 0, replaced: 0 });
        assert_eq!(pipeline.transform_names().collect::<Vec<_>>(), vec!["count"]);
    }
}
