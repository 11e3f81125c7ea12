//! Tree rewrites that run after inline parsing.

use std::sync::Arc;

use log::{trace, warn};

use crate::ast::{Document, NodeId, NodeType};
use crate::extension::Dependent;

/// Rewrites one node.
pub trait PostProcessor {
    /// Returns `Some(replacement)` to substitute the node's subtree, `None`
    /// to leave it (it may still have been edited in place).
    fn process(&mut self, doc: &mut Document, node: NodeId) -> Option<NodeId>;
}

pub trait PostProcessorFactory: Dependent + Send + Sync {
    /// Node types to visit, each with the ancestor types that exclude a
    /// node from processing. Ignored for global-scope factories.
    fn node_types(&self) -> Vec<(NodeType, Vec<NodeType>)> {
        Vec::new()
    }

    fn create(&self, doc: &Document) -> Box<dyn PostProcessor>;
}

/// Whether `node` is still attached under the document root.
fn attached(doc: &Document, node: NodeId) -> bool {
    if doc.is_removed(node) {
        return false;
    }
    node == doc.root() || doc.ancestors(node).any(|a| a == doc.root())
}

fn excluded(doc: &Document, node: NodeId, exclusions: &[NodeType]) -> bool {
    doc.ancestors(node)
        .any(|a| exclusions.contains(&doc.kind(a).node_type()))
}

/// Runs the resolved stages in order.
///
/// Within a stage every matching node is visited once in document order,
/// by each factory of the stage in registration order. A global stage
/// holds a single factory, run once over the root.
pub(crate) fn run_post_processors(
    doc: &mut Document,
    stages: &[Vec<Arc<dyn PostProcessorFactory>>],
) {
    for stage in stages {
        if let [factory] = stage.as_slice()
            && factory.affects_global_scope()
        {
            trace!("post-processing document with {}", factory.dependency_key());
            let root = doc.root();
            if factory.create(doc).process(doc, root).is_some() {
                warn!(
                    "{} tried to replace the document root; ignored",
                    factory.dependency_key()
                );
            }
            continue;
        }

        let mut visitors: Vec<_> = stage
            .iter()
            .map(|f| (f.node_types(), f.create(doc)))
            .collect();
        let nodes: Vec<NodeId> = doc.descendants(doc.root()).collect();
        for node in nodes {
            for (types, processor) in visitors.iter_mut() {
                if !attached(doc, node) {
                    break;
                }
                let node_type = doc.kind(node).node_type();
                let Some((_, exclusions)) = types.iter().find(|(t, _)| *t == node_type) else {
                    continue;
                };
                if excluded(doc, node, exclusions) {
                    continue;
                }
                if let Some(replacement) = processor.process(doc, node)
                    && replacement != node
                {
                    doc.replace(node, replacement);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, CustomNode, DelimitedData, NodeKind};
    use crate::extension::DependencyResolver;
    use crate::parsing::parse;

    /// Turns code spans into `kbd` custom nodes, except inside links.
    struct Keyboard;

    impl Dependent for Keyboard {
        fn dependency_key(&self) -> &'static str {
            "keyboard"
        }
    }

    impl PostProcessor for Keyboard {
        fn process(&mut self, doc: &mut Document, node: NodeId) -> Option<NodeId> {
            let NodeKind::Code(data) = doc.kind(node).clone() else {
                return None;
            };
            let chars = doc.chars(node).clone();
            let kbd = doc.new_node(Ast::new(
                NodeKind::Custom(CustomNode::inline("kbd", data)),
                chars,
            ));
            let children: Vec<NodeId> = doc.children(node).collect();
            for child in children {
                doc.append_node(kbd, child);
            }
            Some(kbd)
        }
    }

    impl PostProcessorFactory for Keyboard {
        fn node_types(&self) -> Vec<(NodeType, Vec<NodeType>)> {
            vec![(NodeType::Code, vec![NodeType::Link])]
        }

        fn create(&self, _doc: &Document) -> Box<dyn PostProcessor> {
            Box::new(Keyboard)
        }
    }

    /// Counts nodes once over the whole document.
    struct Census;

    impl Dependent for Census {
        fn dependency_key(&self) -> &'static str {
            "census"
        }

        fn affects_global_scope(&self) -> bool {
            true
        }
    }

    struct CensusRun;

    impl PostProcessor for CensusRun {
        fn process(&mut self, doc: &mut Document, node: NodeId) -> Option<NodeId> {
            let count = doc.descendants(node).count();
            let chars = doc.source().start_sequence();
            let data = DelimitedData::between(chars.clone(), chars.clone());
            let tag = CustomNode::inline("census", data);
            doc.append(node, Ast::new(NodeKind::Custom(tag), chars));
            assert!(count > 0);
            None
        }
    }

    impl PostProcessorFactory for Census {
        fn create(&self, _doc: &Document) -> Box<dyn PostProcessor> {
            Box::new(CensusRun)
        }
    }

    fn stages(items: Vec<Arc<dyn PostProcessorFactory>>) -> Vec<Vec<Arc<dyn PostProcessorFactory>>> {
        DependencyResolver::resolve(items).unwrap().into_stages()
    }

    fn count(doc: &Document, ty: NodeType) -> usize {
        doc.descendants(doc.root())
            .filter(|&id| doc.kind(id).node_type() == ty)
            .count()
    }

    #[test]
    fn replaces_matching_nodes_outside_excluded_ancestors() {
        let mut doc = parse("`a` and [`b`](/u)\n");
        run_post_processors(&mut doc, &stages(vec![Arc::new(Keyboard)]));
        assert_eq!(count(&doc, NodeType::Custom("kbd")), 1);
        assert_eq!(count(&doc, NodeType::Code), 1);
        let kbd = doc
            .descendants(doc.root())
            .find(|&id| doc.kind(id).node_type() == NodeType::Custom("kbd"))
            .unwrap();
        assert_eq!(doc.text_content(kbd), "a");
        assert_eq!(doc.chars(kbd).as_str(), "`a`");
    }

    #[test]
    fn global_processor_runs_once() {
        let mut doc = parse("a\n\nb\n");
        run_post_processors(&mut doc, &stages(vec![Arc::new(Census)]));
        assert_eq!(count(&doc, NodeType::Custom("census")), 1);
    }
}
