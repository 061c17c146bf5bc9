//! Incremental graph construction for hand-written grammars.

use crate::error::GraphError;
use crate::grammar::{Element, RuleDef, RuleGraph, RuleId};
use compact_str::CompactString;

/// Builds a [`RuleGraph`] rule by rule, deferring error handling to
/// [`finish`](Self::finish).
///
/// Registration failures are recorded and the failed rule is represented by
/// [`RuleId::INVALID`], so long definitions can be written without a `?` on
/// every line.
///
/// ```rust
/// use weave::grammar::{GraphBuilder, RuleDef};
///
/// let mut builder = GraphBuilder::<char>::new();
/// let list = builder.reference("list");
/// let item = builder.define("item", RuleDef::single('x'));
/// let comma = builder.add(RuleDef::single(','));
/// let tail = builder.add(RuleDef::sequence([comma, list]));
/// let optional_tail = builder.add(RuleDef::optional(tail));
/// let root = builder.define("list", RuleDef::sequence([item, optional_tail]));
/// builder.set_root(root);
///
/// let graph = builder.finish()?;
/// let input: Vec<char> = "x,x,x".chars().collect();
/// assert_eq!(graph.parse(&input)?.len, 5);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct GraphBuilder<T> {
    graph: RuleGraph<T>,
    errors: Vec<GraphError>,
}

impl<T: Element> Default for GraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> GraphBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: RuleGraph::new(),
            errors: Vec::new(),
        }
    }

    /// Register `def`.
    pub fn add(&mut self, def: RuleDef<T>) -> RuleId {
        match self.graph.register(def) {
            Ok(id) => id,
            Err(error) => {
                self.errors.push(error);
                RuleId::INVALID
            }
        }
    }

    /// Register `def` under `name`.
    pub fn define(&mut self, name: impl Into<CompactString>, def: RuleDef<T>) -> RuleId {
        self.add(def.named(name))
    }

    /// Register an anonymous reference to `name`, resolved by `finish`.
    pub fn reference(&mut self, name: impl Into<CompactString>) -> RuleId {
        self.add(RuleDef::reference(name))
    }

    pub fn set_root(&mut self, id: RuleId) {
        if let Err(error) = self.graph.set_root(id) {
            self.errors.push(error);
        }
    }

    /// The graph built so far.
    #[must_use]
    pub const fn graph(&self) -> &RuleGraph<T> {
        &self.graph
    }

    /// Resolve references and validate.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, otherwise any resolution or
    /// validation error.
    pub fn finish(self) -> Result<RuleGraph<T>, GraphError> {
        let graph = self.finish_unchecked()?;
        graph.validate()?;
        Ok(graph)
    }

    /// Like [`finish`](Self::finish) but without [`RuleGraph::validate`].
    ///
    /// # Errors
    ///
    /// Returns the first registration error, otherwise any resolution error.
    pub fn finish_unchecked(self) -> Result<RuleGraph<T>, GraphError> {
        let Self { mut graph, errors } = self;
        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }
        graph.resolve_references()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_surface_at_finish() {
        let mut builder = GraphBuilder::<char>::new();
        let a = builder.define("a", RuleDef::single('a'));
        let dup = builder.define("a", RuleDef::single('b'));
        assert_eq!(dup, RuleId::INVALID);
        let seq = builder.add(RuleDef::sequence([a, dup]));
        assert_eq!(seq, RuleId::INVALID);

        assert_eq!(
            builder.finish().unwrap_err(),
            GraphError::DuplicateName { name: "a".into() }
        );
    }

    #[test]
    fn test_finish_resolves_references() {
        let mut builder = GraphBuilder::<char>::new();
        let r = builder.reference("missing");
        builder.set_root(r);
        let error = builder.finish().unwrap_err();
        assert_eq!(error.missing_names(), vec!["missing"]);
    }
}
