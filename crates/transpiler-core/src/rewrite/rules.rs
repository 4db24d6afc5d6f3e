/*!
# Transformation Rules

Core trait and utilities for defining rewrite rules.
*/

use std::fmt;

use crate::ast::Value;

use super::errors::{DuplicateCaptureError, RewriteError};
use super::patterns::{matches, Bindings, CapturePolicy, Pattern};
use super::TransformResult;

/// Core trait for rewrite rules
///
/// A rule is a pattern plus a transform. The transform sees the pattern's
/// captures merged with the caller's external variables and returns the
/// replacement value.
pub trait TransformationRule: Send + Sync {
    /// Name used for tie-break reporting and traces
    fn name(&self) -> &str;

    /// What this rule rewrites
    fn description(&self) -> &str {
        ""
    }

    fn pattern(&self) -> &Pattern;

    /// Build the replacement from merged bindings
    fn transform(&self, bindings: &Bindings) -> TransformResult<Value>;

    /// Test the pattern against `target` with fresh bindings
    fn test(
        &self,
        target: &Value,
        policy: CapturePolicy,
    ) -> Result<Option<Bindings>, DuplicateCaptureError> {
        let mut bindings = Bindings::new();
        if matches(self.pattern(), target, &mut bindings, policy)? {
            Ok(Some(bindings))
        } else {
            Ok(None)
        }
    }

    /// Run the transform on `captures` merged with `external`
    fn apply(&self, captures: &Bindings, external: &Bindings) -> TransformResult<Value> {
        self.transform(&captures.merged(external))
    }
}

type TransformFn = dyn Fn(&Bindings) -> TransformResult<Value> + Send + Sync;

/// A rule backed by a closure
pub struct Rule {
    name: String,
    description: String,
    pattern: Pattern,
    transform: Box<TransformFn>,
}

impl Rule {
    pub fn new<F, V>(name: impl Into<String>, pattern: Pattern, transform: F) -> Self
    where
        F: Fn(&Bindings) -> TransformResult<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            pattern,
            transform: Box::new(move |bindings: &Bindings| transform(bindings).map(Into::into)),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.to_string())
            .finish_non_exhaustive()
    }
}

impl TransformationRule for Rule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, bindings: &Bindings) -> TransformResult<Value> {
        (self.transform)(bindings)
    }
}

/// One rule's successful test against one value
pub struct Match<'a> {
    /// Position of the rule in its set
    pub index: usize,
    pub rule: &'a dyn TransformationRule,
    pub target: &'a Value,
    pub bindings: Bindings,
}

impl Match<'_> {
    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }

    pub fn apply(&self, external: &Bindings) -> TransformResult<Value> {
        self.rule.apply(&self.bindings, external)
    }
}

impl fmt::Debug for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("index", &self.index)
            .field("rule", &self.rule.name())
            .field("target", self.target)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// A rule whose pattern bound one capture name to two different values
pub struct Conflict<'a> {
    pub index: usize,
    pub rule: &'a dyn TransformationRule,
    pub error: DuplicateCaptureError,
}

impl Conflict<'_> {
    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }
}

impl fmt::Debug for Conflict<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conflict")
            .field("index", &self.index)
            .field("rule", &self.rule.name())
            .field("error", &self.error)
            .finish()
    }
}

/// Ordered rule list. Earlier rules win when several match.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn TransformationRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: impl TransformationRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn with_rule(mut self, rule: impl TransformationRule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn push_boxed(&mut self, rule: Box<dyn TransformationRule>) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TransformationRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|rule| rule.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every rule matching `target`, in rule order.
    pub fn matches<'a>(
        &'a self,
        target: &'a Value,
        policy: CapturePolicy,
    ) -> Result<Vec<Match<'a>>, RewriteError> {
        let mut found = Vec::new();
        for (index, rule) in self.iter().enumerate() {
            let bindings = rule
                .test(target, policy)
                .map_err(|e| RewriteError::duplicate_capture(rule.name(), e))?;
            if let Some(bindings) = bindings {
                found.push(Match {
                    index,
                    rule,
                    target,
                    bindings,
                });
            }
        }
        Ok(found)
    }

    /// Like [`RuleSet::matches`], but a capture conflict is reported in
    /// place of that rule's match instead of stopping the test.
    pub fn survey<'a>(
        &'a self,
        target: &'a Value,
        policy: CapturePolicy,
    ) -> Vec<Result<Match<'a>, Conflict<'a>>> {
        self.iter()
            .enumerate()
            .filter_map(|(index, rule)| match rule.test(target, policy) {
                Ok(Some(bindings)) => Some(Ok(Match {
                    index,
                    rule,
                    target,
                    bindings,
                })),
                Ok(None) => None,
                Err(error) => Some(Err(Conflict { index, rule, error })),
            })
            .collect()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.add_rule(rule);
        }
        set
    }
}

/// Per-rule counters for one rewrite call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleStats {
    pub rule_name: String,
    /// Nodes the pattern matched
    pub matches: u64,
    /// Matches whose transform output was used
    pub applications: u64,
    pub errors: u64,
}

impl RuleStats {
    pub fn new(rule_name: String) -> Self {
        Self {
            rule_name,
            ..Self::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            (self.applications as f64) / (self.matches as f64)
        }
    }
}
