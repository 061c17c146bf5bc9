use crate::grammar::RuleId;
use crate::syntax::Span;

/// A parse-tree node: the span a rule matched, the rule's identity and the
/// annotations its sub-rules produced, in match order.
///
/// Annotations form a strict tree; a node is owned by the result that
/// produced it until a parent adopts it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Annotation {
    rule: RuleId,
    span: Span,
    children: Vec<Annotation>,
}

impl Annotation {
    #[must_use]
    pub const fn new(rule: RuleId, span: Span, children: Vec<Self>) -> Self {
        Self {
            rule,
            span,
            children,
        }
    }

    #[must_use]
    pub const fn leaf(rule: RuleId, span: Span) -> Self {
        Self::new(rule, span, Vec::new())
    }

    #[must_use]
    pub const fn rule(&self) -> RuleId {
        self.rule
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn into_children(self) -> Vec<Self> {
        self.children
    }

    /// The same node with its children dropped.
    #[must_use]
    pub fn into_leaf(self) -> Self {
        Self::leaf(self.rule, self.span)
    }

    #[must_use]
    pub fn into_parts(self) -> (RuleId, Span, Vec<Self>) {
        (self.rule, self.span, self.children)
    }

    /// First direct child produced by `rule`.
    #[must_use]
    pub fn child(&self, rule: RuleId) -> Option<&Self> {
        self.children.iter().find(|c| c.rule == rule)
    }

    /// Pre-order traversal over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.descendants().count()
    }
}

/// Pre-order iterator returned by [`Annotation::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Annotation>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Annotation;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> RuleId {
        RuleId::new(n)
    }

    #[test]
    fn test_leaf_and_children() {
        let leaf = Annotation::leaf(id(1), Span::new(0, 1));
        assert!(leaf.is_leaf());

        let node = Annotation::new(id(2), Span::new(0, 2), vec![leaf.clone()]);
        assert_eq!(node.children(), &[leaf.clone()]);
        assert_eq!(node.child(id(1)), Some(&leaf));
        assert_eq!(node.child(id(3)), None);
        assert!(node.clone().into_leaf().is_leaf());
    }

    #[test]
    fn test_descendants_are_pre_order() {
        let tree = Annotation::new(
            id(0),
            Span::new(0, 3),
            vec![
                Annotation::new(id(1), Span::new(0, 2), vec![Annotation::leaf(id(2), Span::new(0, 1))]),
                Annotation::leaf(id(3), Span::new(2, 1)),
            ],
        );

        let order: Vec<u32> = tree.descendants().map(|a| a.rule().index() as u32).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(tree.node_count(), 4);
    }
}
