//! # Rule Graph
//!
//! The arena owning every rule of one matching phase.
//!
//! Rules are addressed by dense [`RuleId`]s handed out at registration.
//! Composite rules hold the ids of their sub-rules, so recursion and forward
//! references never need shared ownership: a [`RuleKind::Reference`] carries
//! a target name until [`RuleGraph::resolve_references`] points it at a rule.
//!
//! After registration rules only change in two ways: a reference gets its
//! subject, and [`RuleGraph::replace`] redirects edges from one rule to
//! another (breakpoints, merging).

use crate::error::diagnostics::did_you_mean;
use crate::error::{GraphError, MissingReference, ParseAbort};
use crate::grammar::analysis::{GraphMetrics, nullable_table};
use crate::grammar::{Element, Rule, RuleDef, RuleId, RuleKind};
use crate::parser::{MatchResult, Matcher, ParseConfig};
use crate::syntax::RuleNames;
use compact_str::CompactString;
use hashbrown::HashMap;
use std::borrow::Cow;

/// Registry of all rules for one element type.
#[derive(Debug, Clone)]
pub struct RuleGraph<T> {
    rules: Vec<Rule<T>>,
    names: HashMap<CompactString, RuleId>,
    root: Option<RuleId>,
}

impl<T> Default for RuleGraph<T> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            names: HashMap::new(),
            root: None,
        }
    }
}

/// Outcome of [`RuleGraph::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Number of rules copied into the graph
    pub added: usize,
    /// Names already present, whose incoming rule was dropped
    pub shadowed: Vec<CompactString>,
    /// Where each rule of the merged graph ended up, indexed by its old id
    pub remap: Vec<RuleId>,
}

impl MergeReport {
    /// New id of a rule of the merged graph.
    #[must_use]
    pub fn mapped(&self, old: RuleId) -> Option<RuleId> {
        self.remap.get(old.index()).copied()
    }
}

impl<T: Element> RuleGraph<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, assigning it the next id.
    ///
    /// # Errors
    ///
    /// Fails without changing the graph when the name is taken or a sub-rule
    /// id is not registered.
    pub fn register(&mut self, def: RuleDef<T>) -> Result<RuleId, GraphError> {
        if let Some(name) = &def.name
            && self.names.contains_key(name)
        {
            return Err(GraphError::DuplicateName {
                name: name.to_string(),
            });
        }
        if let Some(unknown) = def.kind.sub_rules().into_iter().find(|id| !self.contains(*id)) {
            return Err(GraphError::UnknownRule { id: unknown });
        }

        let id = RuleId::from_index(self.rules.len());
        if let Some(name) = &def.name {
            self.names.insert(name.clone(), id);
        }
        self.rules.push(Rule {
            id,
            name: def.name,
            pruning: def.pruning,
            precedence: def.precedence,
            kind: def.kind,
        });
        Ok(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: RuleId) -> bool {
        id.index() < self.rules.len()
    }

    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&Rule<T>> {
        self.rules.get(id.index())
    }

    #[must_use]
    pub fn rule_by_name(&self, name: &str) -> Option<&Rule<T>> {
        self.id_of(name).and_then(|id| self.rule(id))
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn name_of(&self, id: RuleId) -> Option<&str> {
        self.rule(id).and_then(Rule::name)
    }

    /// Name of `id`, `kind#id` for anonymous rules.
    #[must_use]
    pub fn display_name(&self, id: RuleId) -> Cow<'_, str> {
        self.rule(id)
            .map_or_else(|| Cow::Owned(id.to_string()), Rule::display_name)
    }

    /// Whether `id` is a log rule, whose annotations are diagnostics.
    #[must_use]
    pub fn is_log(&self, id: RuleId) -> bool {
        matches!(self.rule(id).map(Rule::kind), Some(RuleKind::Log { .. }))
    }

    /// All rules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule<T>> {
        self.rules.iter()
    }

    /// Named rules in id order.
    pub fn named(&self) -> impl Iterator<Item = (&str, RuleId)> {
        self.rules
            .iter()
            .filter_map(|rule| rule.name().map(|name| (name, rule.id)))
    }

    #[must_use]
    pub const fn root(&self) -> Option<RuleId> {
        self.root
    }

    /// # Errors
    ///
    /// Fails if `id` is not registered.
    pub fn set_root(&mut self, id: RuleId) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownRule { id });
        }
        self.root = Some(id);
        Ok(())
    }

    /// Point every unresolved reference at the rule its target names.
    ///
    /// # Errors
    ///
    /// References that remain unresolved and are reachable from the root
    /// (from any rule when there is no root) are reported together in one
    /// [`GraphError::MissingReferences`].
    pub fn resolve_references(&mut self) -> Result<(), GraphError> {
        self.resolve_references_lenient();

        let reachable = match self.root {
            Some(_) => self.reachable(),
            None => vec![true; self.rules.len()],
        };
        let mut missing: Vec<MissingReference> = Vec::new();
        for rule in &self.rules {
            if let RuleKind::Reference {
                target,
                subject: None,
            } = &rule.kind
                && reachable[rule.id.index()]
                && !missing.iter().any(|m| m.name == target.as_str())
            {
                missing.push(MissingReference {
                    name: target.to_string(),
                    suggestion: did_you_mean(target, self.names.keys().map(CompactString::as_str)),
                });
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GraphError::MissingReferences { missing })
        }
    }

    /// Resolve what can be resolved; returns the target names left dangling.
    pub fn resolve_references_lenient(&mut self) -> Vec<CompactString> {
        let mut dangling = Vec::new();
        for rule in &mut self.rules {
            if let RuleKind::Reference { target, subject } = &mut rule.kind
                && subject.is_none()
            {
                match self.names.get(target) {
                    Some(id) => *subject = Some(*id),
                    None => {
                        if !dangling.contains(target) {
                            dangling.push(target.clone());
                        }
                    }
                }
            }
        }
        dangling
    }

    /// Reachability from the root, indexed by rule index. Everything is
    /// unreachable without a root.
    #[must_use]
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.rules.len()];
        let mut stack: Vec<RuleId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(flag) = seen.get_mut(id.index()) else {
                continue;
            };
            if *flag {
                continue;
            }
            *flag = true;
            if let Some(rule) = self.rule(id) {
                stack.extend(rule.kind.sub_rules());
            }
        }
        seen
    }

    /// Static checks run after resolution.
    ///
    /// # Errors
    ///
    /// Rejects unbounded repetition of a sub-rule that can match without
    /// consuming input, which could never make progress.
    pub fn validate(&self) -> Result<(), GraphError> {
        let nullable = nullable_table(self);
        for rule in &self.rules {
            if let RuleKind::Count { sub, max: 0, .. } = rule.kind
                && nullable.get(sub.index()).copied().unwrap_or(false)
            {
                return Err(GraphError::NullableRepetition {
                    rule: rule.display_name().into_owned(),
                });
            }
        }
        Ok(())
    }

    /// Redirect every edge pointing at `from` to `to`, except the edges of
    /// `to` itself. The root moves too.
    ///
    /// # Errors
    ///
    /// Fails if either id is not registered.
    pub fn replace(&mut self, from: RuleId, to: RuleId) -> Result<(), GraphError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(GraphError::UnknownRule { id });
            }
        }
        for rule in &mut self.rules {
            if rule.id == to {
                continue;
            }
            rule.kind.for_each_sub_rule_mut(|edge| {
                if *edge == from {
                    *edge = to;
                }
            });
        }
        if self.root == Some(from) {
            self.root = Some(to);
        }
        Ok(())
    }

    /// Wrap the rule `name` in a [`RuleKind::BreakPoint`] seen by every
    /// rule that used to point at it.
    ///
    /// # Errors
    ///
    /// Fails if no rule has that name.
    pub fn set_breakpoint(&mut self, name: &str) -> Result<RuleId, GraphError> {
        let target = self.id_of(name).ok_or_else(|| GraphError::UnknownName {
            name: name.to_string(),
        })?;
        if let Some(existing) = self.breakpoints_on(target).first() {
            return Ok(*existing);
        }
        let breakpoint = self.register(RuleDef::breakpoint(target))?;
        self.replace(target, breakpoint)?;
        log::debug!("breakpoint set on '{name}'");
        Ok(breakpoint)
    }

    /// Undo [`set_breakpoint`](Self::set_breakpoint). The breakpoint rule
    /// stays registered but nothing points at it any more.
    ///
    /// # Errors
    ///
    /// Fails if no rule has that name.
    pub fn clear_breakpoint(&mut self, name: &str) -> Result<(), GraphError> {
        let target = self.id_of(name).ok_or_else(|| GraphError::UnknownName {
            name: name.to_string(),
        })?;
        for breakpoint in self.breakpoints_on(target) {
            self.replace(breakpoint, target)?;
        }
        log::debug!("breakpoint cleared on '{name}'");
        Ok(())
    }

    fn breakpoints_on(&self, target: RuleId) -> Vec<RuleId> {
        let referenced = self.referenced();
        self.rules
            .iter()
            .filter(|rule| matches!(rule.kind, RuleKind::BreakPoint(sub) if sub == target))
            .filter(|rule| referenced[rule.id.index()] || self.root == Some(rule.id))
            .map(|rule| rule.id)
            .collect()
    }

    /// Whether each rule is the target of at least one edge.
    fn referenced(&self) -> Vec<bool> {
        let mut referenced = vec![false; self.rules.len()];
        for rule in &self.rules {
            for sub in rule.kind.sub_rules() {
                if let Some(flag) = referenced.get_mut(sub.index()) {
                    *flag = true;
                }
            }
        }
        referenced
    }

    /// Copy the rules of `other` into this graph.
    ///
    /// Anonymous rules and rules with new names are appended with fresh ids.
    /// A named rule whose name already exists is dropped and everything that
    /// pointed at it points at the existing rule instead, so the first
    /// registration of a name wins. References still unresolved afterwards
    /// are resolved against this graph's names.
    pub fn merge(&mut self, other: &Self) -> MergeReport {
        let mut report = MergeReport {
            remap: vec![RuleId::INVALID; other.len()],
            ..MergeReport::default()
        };

        let mut next = self.rules.len();
        for rule in &other.rules {
            let slot = &mut report.remap[rule.id.index()];
            if let Some(name) = &rule.name
                && let Some(existing) = self.names.get(name)
            {
                *slot = *existing;
                report.shadowed.push(name.clone());
            } else {
                *slot = RuleId::from_index(next);
                next += 1;
            }
        }

        let base = self.rules.len();
        for rule in &other.rules {
            let id = report.remap[rule.id.index()];
            if id.index() < base {
                continue;
            }
            let mut copy = rule.clone();
            copy.id = id;
            copy.kind.for_each_sub_rule_mut(|edge| {
                *edge = report.remap.get(edge.index()).copied().unwrap_or(RuleId::INVALID);
            });
            if let Some(name) = &copy.name {
                self.names.insert(name.clone(), id);
            }
            self.rules.push(copy);
            report.added += 1;
        }

        if self.root.is_none() {
            self.root = other.root.and_then(|root| report.mapped(root));
        }
        self.resolve_references_lenient();
        log::debug!(
            "merged {} rules, {} shadowed by existing names",
            report.added,
            report.shadowed.len()
        );
        report
    }

    #[must_use]
    pub fn metrics(&self) -> GraphMetrics {
        GraphMetrics::compute(self)
    }

    /// Match the root rule at the start of `input`.
    ///
    /// # Errors
    ///
    /// See [`Matcher::parse`]; also fails when the graph has no root.
    pub fn parse(&self, input: &[T]) -> MatchResult {
        self.parse_with(input, ParseConfig::default())
    }

    /// [`parse`](Self::parse) with explicit settings.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_with(&self, input: &[T], config: ParseConfig) -> MatchResult {
        let root = self.root.ok_or(ParseAbort::MissingRoot)?;
        self.parse_rule(root, input, 0, config)
    }

    /// Match rule `id` at `start`.
    ///
    /// # Errors
    ///
    /// See [`Matcher::parse`].
    pub fn parse_rule(&self, id: RuleId, input: &[T], start: usize, config: ParseConfig) -> MatchResult {
        Matcher::new(self, input, config).parse(id, start)
    }
}

impl<T: Element> RuleNames for RuleGraph<T> {
    fn rule_name(&self, id: RuleId) -> Cow<'_, str> {
        self.display_name(id)
    }
}
