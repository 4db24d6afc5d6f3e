/*!
# Rewriter - Bottom-Up Rewrite Engine

Walks a tree children-first and replaces each node with the output of the
first rule that matches it. A single pass: rule output is never walked again.
*/

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::ast::{Kind, Node, Printer, Value};

use super::errors::RewriteError;
use super::patterns::{Bindings, CapturePolicy};
use super::rules::{Conflict, Match, RuleSet, RuleStats};
use super::trace::{TraceMatch, TraceOutcome, TraceRecord, TraceSink};
use super::{PathSegment, RewriteContext};

/// Where rules are allowed to fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every node, children first; the first matching rule wins.
    #[default]
    BottomUp,
    /// Only the unrewritten root, which must match exactly one rule.
    TopLevel,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::BottomUp => f.write_str("bottom-up"),
            MatchMode::TopLevel => f.write_str("top-level"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown match mode `{0}` (expected `bottom-up` or `top-level`)")]
pub struct UnknownModeError(pub String);

impl FromStr for MatchMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bottom-up" => Ok(MatchMode::BottomUp),
            "top-level" => Ok(MatchMode::TopLevel),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

/// Counters for one rewrite call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RewriteSummary {
    pub nodes_visited: u64,
    pub rewrites: u64,
    /// One entry per rule, in rule order. Rules sharing a name keep
    /// separate counters.
    pub rule_stats: Vec<RuleStats>,
}

impl RewriteSummary {
    fn new(rules: &RuleSet) -> Self {
        Self {
            rule_stats: rules
                .names()
                .into_iter()
                .map(|name| RuleStats::new(name.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Counters of the first rule named `rule`.
    pub fn stats(&self, rule: &str) -> Option<&RuleStats> {
        self.rule_stats.iter().find(|stats| stats.rule_name == rule)
    }

    /// Counters of the rule at `index` in the rule set.
    pub fn stats_at(&self, index: usize) -> Option<&RuleStats> {
        self.rule_stats.get(index)
    }

    fn record(&mut self, index: usize, update: impl FnOnce(&mut RuleStats)) {
        if let Some(stats) = self.rule_stats.get_mut(index) {
            update(stats);
        }
    }
}

impl fmt::Display for RewriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} node(s) visited, {} rewritten",
            self.nodes_visited, self.rewrites
        )
    }
}

/// A rewritten tree with the statistics of the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub value: Value,
    pub summary: RewriteSummary,
}

/// Rewrite engine over an ordered rule set.
///
/// Holds no state between calls.
#[derive(Debug)]
pub struct Rewriter<'r> {
    rules: &'r RuleSet,
    mode: MatchMode,
    policy: CapturePolicy,
    printer: Printer,
}

impl<'r> Rewriter<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            mode: MatchMode::default(),
            policy: CapturePolicy::default(),
            printer: Printer::default(),
        }
    }

    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn capture_policy(mut self, policy: CapturePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Printer used for the candidate and replacement text in traces.
    pub fn printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    pub fn rewrite(&self, root: &Node, vars: &Bindings) -> Result<Value, RewriteError> {
        Ok(self.run(root, vars, None)?.value)
    }

    /// Rewrite, sending one record per composite node to `sink`.
    pub fn rewrite_traced(
        &self,
        root: &Node,
        vars: &Bindings,
        sink: &mut dyn TraceSink,
    ) -> Result<Value, RewriteError> {
        Ok(self.run(root, vars, Some(sink))?.value)
    }

    pub fn rewrite_with_summary(&self, root: &Node, vars: &Bindings) -> Result<Rewritten, RewriteError> {
        self.run(root, vars, None)
    }

    /// Record what every rule would do at every node of the unmodified
    /// tree. Nothing has to match, and failing transforms show up in the
    /// trace instead of aborting.
    pub fn trace(
        &self,
        root: &Node,
        vars: &Bindings,
        sink: &mut dyn TraceSink,
    ) -> Result<RewriteSummary, RewriteError> {
        let mut pass = Pass::new(self, vars, Some(sink), false);
        pass.visit_node(root, &RewriteContext::new())?;
        Ok(pass.summary)
    }

    fn run(
        &self,
        root: &Node,
        vars: &Bindings,
        sink: Option<&mut dyn TraceSink>,
    ) -> Result<Rewritten, RewriteError> {
        let ctx = RewriteContext::new();
        let (value, summary) = match self.mode {
            MatchMode::BottomUp => {
                let mut pass = Pass::new(self, vars, sink, true);
                let value = pass.visit_node(root, &ctx)?;
                (value, pass.summary)
            }
            MatchMode::TopLevel => {
                let surveyed = sink.is_some();
                let mut pass = Pass::new(self, vars, sink, false);
                if surveyed {
                    pass.visit_node(root, &ctx)?;
                }
                let value = pass.select_root(root, !surveyed)?;
                (value, pass.summary)
            }
        };

        debug!(
            mode = %self.mode,
            nodes = summary.nodes_visited,
            rewrites = summary.rewrites,
            "rewrite finished"
        );
        Ok(Rewritten { value, summary })
    }
}

/// Rewrite `tree` bottom-up with `rules`, optionally tracing to `sink`.
pub fn rewrite(
    tree: &Node,
    rules: &RuleSet,
    vars: &Bindings,
    sink: Option<&mut dyn TraceSink>,
) -> Result<Value, RewriteError> {
    Ok(Rewriter::new(rules).run(tree, vars, sink)?.value)
}

/// State of one traversal.
struct Pass<'a, 'r, 's> {
    rules: &'r RuleSet,
    printer: &'a Printer,
    policy: CapturePolicy,
    vars: &'a Bindings,
    sink: Option<&'s mut dyn TraceSink>,
    /// False when only surveying: rules are tested and traced but the
    /// tree is returned as it was.
    substitute: bool,
    summary: RewriteSummary,
}

impl<'a, 'r, 's> Pass<'a, 'r, 's> {
    fn new(
        rewriter: &'a Rewriter<'r>,
        vars: &'a Bindings,
        sink: Option<&'s mut dyn TraceSink>,
        substitute: bool,
    ) -> Self {
        Self {
            rules: rewriter.rules,
            printer: &rewriter.printer,
            policy: rewriter.policy,
            vars,
            sink,
            substitute,
            summary: RewriteSummary::new(rewriter.rules),
        }
    }

    fn visit(&mut self, value: &Value, ctx: &RewriteContext) -> Result<Value, RewriteError> {
        match value {
            Value::Node(node) => self.visit_node(node, ctx),
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.visit(item, &ctx.descend(PathSegment::Index(i))))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, item)| {
                    let child = ctx.descend(PathSegment::Key(key.clone()));
                    Ok((key.clone(), self.visit(item, &child)?))
                })
                .collect::<Result<IndexMap<_, _>, RewriteError>>()
                .map(Value::Map),
            scalar => Ok(scalar.clone()),
        }
    }

    fn visit_node(&mut self, node: &Node, ctx: &RewriteContext) -> Result<Value, RewriteError> {
        self.summary.nodes_visited += 1;

        let mut fields = Vec::with_capacity(node.kind().arity());
        for (name, child) in node.fields() {
            let rewritten = self.visit(child, &ctx.descend(PathSegment::Field(name)))?;
            fields.push((name, rewritten));
        }
        let candidate = Node::from_fields(node.kind(), fields)?;

        self.resolve(candidate, ctx)
    }

    /// Test every rule against `candidate` and pick the replacement.
    ///
    /// When only surveying, a capture conflict is traced as a failure of
    /// that rule instead of aborting.
    fn resolve(&mut self, candidate: Node, ctx: &RewriteContext) -> Result<Value, RewriteError> {
        let rules = self.rules;
        let kind = candidate.kind();
        let candidate = Value::Node(candidate);
        let tested: Vec<Result<Match<'_>, Conflict<'_>>> = if self.substitute {
            rules.matches(&candidate, self.policy)?.into_iter().map(Ok).collect()
        } else {
            rules.survey(&candidate, self.policy)
        };

        trace!(
            path = %ctx.path(),
            kind = %kind,
            matched = tested.iter().flatten().count(),
            "tested rules"
        );
        for entry in &tested {
            match entry {
                Ok(m) => self.summary.record(m.index, |stats| stats.matches += 1),
                Err(conflict) => self.summary.record(conflict.index, |stats| stats.errors += 1),
            }
        }

        let mut selected = None;
        if self.sink.is_some() {
            let candidate_text = self.render(&candidate);
            let mut shown = Vec::with_capacity(tested.len());
            for entry in &tested {
                let (rule, replacement) = match entry {
                    Ok(m) => {
                        let first = selected.is_none();
                        let replacement = match self.apply(m, ctx, kind) {
                            Ok(value) => {
                                let text = self.render(&value);
                                if first {
                                    selected = Some((m.index, m.rule_name().to_string(), value));
                                }
                                text
                            }
                            Err(err) if first && self.substitute => return Err(err),
                            Err(err) => failure_text(&err),
                        };
                        (m.rule_name(), replacement)
                    }
                    Err(conflict) => (conflict.rule_name(), format!("<failed: {}>", conflict.error)),
                };
                shown.push(TraceMatch {
                    rule: rule.to_string(),
                    candidate: candidate_text.clone(),
                    replacement,
                });
            }
            let outcome = if shown.is_empty() {
                TraceOutcome::NoMatch
            } else {
                TraceOutcome::Matched(shown)
            };
            self.emit(TraceRecord {
                path: ctx.path(),
                kind,
                outcome,
            })?;
        } else if self.substitute {
            if let Some(m) = tested.iter().flatten().next() {
                selected = Some((m.index, m.rule_name().to_string(), self.apply(m, ctx, kind)?));
            }
        }
        drop(tested);

        match selected {
            Some((index, rule, value)) if self.substitute => {
                debug!(path = %ctx.path(), kind = %kind, rule = %rule, "rewrote node");
                self.summary.record(index, |stats| stats.applications += 1);
                self.summary.rewrites += 1;
                Ok(value)
            }
            _ => Ok(candidate),
        }
    }

    /// Strict top-level selection against the unrewritten root.
    fn select_root(&mut self, root: &Node, count: bool) -> Result<Value, RewriteError> {
        let rules = self.rules;
        let kind = root.kind();
        let target = Value::Node(root.clone());
        let found = rules.matches(&target, self.policy)?;

        if count {
            self.summary.nodes_visited += 1;
            for m in &found {
                self.summary.record(m.index, |stats| stats.matches += 1);
            }
        }

        match found.as_slice() {
            [] => Err(RewriteError::NoRuleMatched { kind }),
            [only] => {
                let value = self.apply(only, &RewriteContext::new(), kind)?;
                self.summary.record(only.index, |stats| stats.applications += 1);
                self.summary.rewrites += 1;
                Ok(value)
            }
            several => Err(RewriteError::AmbiguousMatch {
                kind,
                rules: several.iter().map(|m| m.rule_name().to_string()).collect(),
            }),
        }
    }

    fn apply(&mut self, m: &Match<'_>, ctx: &RewriteContext, kind: Kind) -> Result<Value, RewriteError> {
        m.apply(self.vars).map_err(|source| {
            self.summary.record(m.index, |stats| stats.errors += 1);
            RewriteError::Transform {
                rule: m.rule_name().to_string(),
                path: ctx.path(),
                kind,
                source,
            }
        })
    }

    fn emit(&mut self, record: TraceRecord) -> Result<(), RewriteError> {
        debug!("{record}");
        if let Some(sink) = self.sink.as_mut() {
            sink.record(record)?;
        }
        Ok(())
    }

    fn render(&self, value: &Value) -> String {
        self.printer
            .render(value)
            .unwrap_or_else(|err| format!("<unprintable: {err}>"))
    }
}

fn failure_text(err: &RewriteError) -> String {
    match err {
        RewriteError::Transform { source, .. } => format!("<failed: {source}>"),
        other => format!("<failed: {other}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::rewrite::{Pattern, Rule};

    fn names_to_strings() -> RuleSet {
        RuleSet::new().with_rule(Rule::new(
            "name_to_str",
            Pattern::node(Kind::Name, [Pattern::capture("id"), Pattern::leaf(Kind::Load)]).unwrap(),
            |b: &Bindings| Ok(build::string(b.str("id")?)),
        ))
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("bottom-up".parse::<MatchMode>().unwrap(), MatchMode::BottomUp);
        assert_eq!("top-level".parse::<MatchMode>().unwrap(), MatchMode::TopLevel);
        assert_eq!(MatchMode::TopLevel.to_string(), "top-level");
        assert!("sideways".parse::<MatchMode>().is_err());
    }

    #[test]
    fn test_summary_counts() {
        let rules = names_to_strings();
        let tree = build::bin_op(build::load("a"), Kind::Add, build::load("b"));
        let out = Rewriter::new(&rules)
            .rewrite_with_summary(&tree, &Bindings::new())
            .unwrap();

        assert_eq!(
            out.value,
            Value::Node(build::bin_op(build::string("a"), Kind::Add, build::string("b")))
        );
        // BinOp, two Names, two Loads, one Add
        assert_eq!(out.summary.nodes_visited, 6);
        assert_eq!(out.summary.rewrites, 2);
        let stats = out.summary.stats("name_to_str").unwrap();
        assert_eq!((stats.matches, stats.applications, stats.errors), (2, 2, 0));
    }

    #[test]
    fn test_summary_fresh_per_call() {
        let rules = names_to_strings();
        let rewriter = Rewriter::new(&rules);
        let tree = build::load("a");
        let first = rewriter.rewrite_with_summary(&tree, &Bindings::new()).unwrap();
        let second = rewriter.rewrite_with_summary(&tree, &Bindings::new()).unwrap();
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn test_trace_only_tolerates_failures() {
        let rules = RuleSet::new().with_rule(Rule::new(
            "needs_var",
            Pattern::leaf(Kind::Pass),
            |b: &Bindings| Ok(b.get("missing")?.clone()),
        ));
        let tree = build::module(vec![build::pass().into()]);
        let mut records: Vec<TraceRecord> = Vec::new();
        let summary = Rewriter::new(&rules)
            .trace(&tree, &Bindings::new(), &mut records)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, ".body[0]");
        match &records[0].outcome {
            TraceOutcome::Matched(found) => {
                assert_eq!(found[0].replacement, "<failed: no binding named `missing`>");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(records[1].path, "<root>");
        assert_eq!(records[1].outcome, TraceOutcome::NoMatch);
        assert_eq!(summary.stats("needs_var").unwrap().errors, 1);
        assert_eq!(summary.rewrites, 0);
    }

    fn same_sides() -> Rule {
        Rule::new(
            "double",
            Pattern::node(
                Kind::BinOp,
                [Pattern::capture("x"), Pattern::leaf(Kind::Add), Pattern::capture("x")],
            )
            .unwrap(),
            |b: &Bindings| Ok(build::bin_op(b.node("x")?.clone(), Kind::Mult, build::num(2))),
        )
    }

    #[test]
    fn test_trace_only_tolerates_capture_conflicts() {
        let rules = RuleSet::new().with_rule(same_sides());
        let tree = build::bin_op(build::load("a"), Kind::Add, build::load("b"));
        let mut records: Vec<TraceRecord> = Vec::new();
        let summary = Rewriter::new(&rules)
            .trace(&tree, &Bindings::new(), &mut records)
            .unwrap();

        assert_eq!(records.len(), 6);
        let root = &records[5];
        assert_eq!(root.path, "<root>");
        assert_eq!(
            root.outcome,
            TraceOutcome::Matched(vec![TraceMatch {
                rule: "double".to_string(),
                candidate: "a + b".to_string(),
                replacement: "<failed: capture `x` bound twice to different values>".to_string(),
            }])
        );
        let stats = summary.stats("double").unwrap();
        assert_eq!((stats.matches, stats.errors), (0, 1));

        // Substituting still refuses the conflict
        let err = Rewriter::new(&rules).rewrite(&tree, &Bindings::new()).unwrap_err();
        assert!(matches!(err, RewriteError::DuplicateCapture { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_trace_conflict_does_not_hide_later_rules() {
        let rules = RuleSet::new().with_rule(same_sides()).with_rule(Rule::new(
            "any_add",
            Pattern::node(
                Kind::BinOp,
                [Pattern::capture("l"), Pattern::leaf(Kind::Add), Pattern::capture("r")],
            )
            .unwrap(),
            |b: &Bindings| Ok(b.node("l")?.clone()),
        ));
        let tree = build::bin_op(build::load("a"), Kind::Add, build::load("b"));
        let mut records: Vec<TraceRecord> = Vec::new();
        Rewriter::new(&rules)
            .trace(&tree, &Bindings::new(), &mut records)
            .unwrap();

        match &records[5].outcome {
            TraceOutcome::Matched(found) => {
                let shown: Vec<_> = found
                    .iter()
                    .map(|m| (m.rule.as_str(), m.replacement.as_str()))
                    .collect();
                assert_eq!(
                    shown,
                    [
                        ("double", "<failed: capture `x` bound twice to different values>"),
                        ("any_add", "a"),
                    ]
                );
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_rules_sharing_a_name_keep_separate_counts() {
        let rules = names_to_strings().with_rule(Rule::new(
            "name_to_str",
            Pattern::node(Kind::Name, [Pattern::capture("id"), Pattern::leaf(Kind::Load)]).unwrap(),
            |_: &Bindings| Ok(Value::None),
        ));
        let tree = build::bin_op(build::load("a"), Kind::Add, build::load("b"));
        let out = Rewriter::new(&rules)
            .rewrite_with_summary(&tree, &Bindings::new())
            .unwrap();

        assert_eq!(out.summary.rule_stats.len(), 2);
        let first = out.summary.stats_at(0).unwrap();
        let second = out.summary.stats_at(1).unwrap();
        assert_eq!((first.matches, first.applications), (2, 2));
        assert_eq!((second.matches, second.applications), (2, 0));
        assert_eq!(out.summary.stats("name_to_str"), Some(first));
    }
}
