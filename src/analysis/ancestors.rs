//! Immutable ancestor stack threaded through recursive tree walks.
//!
//! Each recursive call pushes its node onto a stack frame that lives on the
//! caller's stack, so the chain costs nothing to extend and can be shared by
//! every sibling without copying.

use tree_sitter::Node;

struct Link<'s, 't> {
    node: Node<'t>,
    rest: Ancestors<'s, 't>,
}

/// The chain of enclosing nodes, innermost first when iterated.
#[derive(Clone, Copy)]
pub struct Ancestors<'s, 't> {
    head: Option<&'s Link<'s, 't>>,
}

impl<'s, 't> Ancestors<'s, 't> {
    /// The empty chain (for the root node).
    pub fn root() -> Self {
        Self { head: None }
    }

    /// Run `f` with `node` pushed on top of this chain.
    pub fn with<R>(self, node: Node<'t>, f: impl for<'x> FnOnce(Ancestors<'x, 't>) -> R) -> R {
        let link = Link { node, rest: self };
        f(Ancestors { head: Some(&link) })
    }

    /// The nearest enclosing node.
    pub fn parent(&self) -> Option<Node<'t>> {
        self.head.map(|link| link.node)
    }

    /// The second-nearest enclosing node.
    pub fn grandparent(&self) -> Option<Node<'t>> {
        self.head.and_then(|link| link.rest.parent())
    }

    /// Enclosing nodes from innermost to outermost.
    pub fn iter(&self) -> AncestorIter<'s, 't> {
        AncestorIter { next: self.head }
    }

    /// Nearest enclosing node whose kind is one of `kinds`.
    pub fn nearest(&self, kinds: &[&str]) -> Option<Node<'t>> {
        self.iter().find(|n| kinds.contains(&n.kind()))
    }

    /// Whether any enclosing node has one of `kinds`.
    pub fn any_of(&self, kinds: &[&str]) -> bool {
        self.nearest(kinds).is_some()
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }
}

pub struct AncestorIter<'s, 't> {
    next: Option<&'s Link<'s, 't>>,
}

impl<'s, 't> Iterator for AncestorIter<'s, 't> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let link = self.next?;
        self.next = link.rest.head;
        Some(link.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn collect_depths<'s, 't>(node: Node<'t>, ancestors: Ancestors<'s, 't>, out: &mut Vec<(String, usize)>) {
        out.push((node.kind().to_string(), ancestors.depth()));
        ancestors.with(node, |inner| {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_depths(child, inner, out);
            }
        });
    }

    #[test]
    fn test_chain_tracks_depth() {
        let tree = parse("class A:\n    def f(self):\n        pass\n");
        let mut out = Vec::new();
        collect_depths(tree.root_node(), Ancestors::root(), &mut out);

        assert_eq!(out[0], ("module".to_string(), 0));
        assert!(out.iter().any(|(k, d)| k == "class_definition" && *d == 1));
        let func_depth = out
            .iter()
            .find(|(k, _)| k == "function_definition")
            .map(|(_, d)| *d)
            .unwrap();
        assert!(func_depth > 1);
    }

    #[test]
    fn test_nearest_finds_innermost() {
        let tree = parse("class A:\n    def f(self):\n        pass\n");
        let root = tree.root_node();
        let class = root.named_child(0).unwrap();
        Ancestors::root().with(root, |a| {
            a.with(class, |b| {
                assert_eq!(b.parent().map(|n| n.kind()), Some("class_definition"));
                assert_eq!(b.grandparent().map(|n| n.kind()), Some("module"));
                assert!(b.any_of(&["module"]));
                assert!(!b.any_of(&["function_definition"]));
            })
        });
    }
}
