/*!
# Rewrite Engine Integration Tests

Traversal order, rule selection, match modes, tracing and error reporting.
*/

use anyhow::anyhow;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use transpiler_core::ast::{build, Kind, Node, ToSource, Value};
use transpiler_core::rewrite::{
    rewrite, Bindings, CapturePolicy, Constraint, MatchMode, Pattern, RewriteError, Rewriter,
    Rule, RuleSet, TraceOutcome, TraceRecord,
};

fn any_name(capture: &str) -> anyhow::Result<Pattern> {
    Ok(Pattern::node(
        Kind::Name,
        [Pattern::capture_as(capture, [Constraint::Str]), Pattern::capture("ctx")],
    )?)
}

/// Renames every name to upper case.
fn shout() -> anyhow::Result<Rule> {
    Ok(Rule::new("shout", any_name("id")?, |b: &Bindings| {
        Ok(build::name(b.str("id")?.to_uppercase(), b.node("ctx")?.kind()))
    }))
}

fn sum(left: &str, right: &str) -> Node {
    build::bin_op(build::load(left), Kind::Add, build::load(right))
}

#[test]
fn test_first_matching_rule_wins() -> anyhow::Result<()> {
    let rules = RuleSet::new()
        .with_rule(Rule::new("first", any_name("id")?, |_: &Bindings| Ok(build::load("one"))))
        .with_rule(Rule::new("second", any_name("id")?, |_: &Bindings| Ok(build::load("two"))));

    let out = Rewriter::new(&rules).rewrite(&build::load("x"), &Bindings::new())?;
    assert_eq!(out.to_source()?, "one");
    Ok(())
}

#[test]
fn test_parent_sees_rewritten_children() -> anyhow::Result<()> {
    let flip = Rule::new(
        "flip",
        Pattern::node(
            Kind::BinOp,
            [Pattern::capture("l"), Pattern::leaf(Kind::Add), Pattern::capture("r")],
        )?,
        |b: &Bindings| Ok(build::bin_op(b.get("r")?.clone(), Kind::Sub, b.get("l")?.clone())),
    );
    let rules = RuleSet::new().with_rule(shout()?).with_rule(flip);

    let out = rewrite(&sum("a", "b"), &rules, &Bindings::new(), None)?;
    assert_eq!(out.to_source()?, "B - A");
    Ok(())
}

#[test]
fn test_output_is_not_rewritten_again() -> anyhow::Result<()> {
    // Matches its own output; a second look would never terminate
    let grow = Rule::new(
        "grow",
        Pattern::node(Kind::Num, [Pattern::capture_as("n", [Constraint::Int])])?,
        |b: &Bindings| {
            let n = b.get("n")?.clone();
            Ok(build::bin_op(build::num(n), Kind::Add, build::num(1)))
        },
    );
    let rules = RuleSet::new().with_rule(grow);

    let out = rewrite(&build::num(41), &rules, &Bindings::new(), None)?;
    assert_eq!(out.to_source()?, "41 + 1");
    Ok(())
}

#[test]
fn test_lists_and_maps_are_traversed() -> anyhow::Result<()> {
    let mut keywords = IndexMap::new();
    keywords.insert("key".to_string(), Value::Node(build::load("k")));
    let tree = build::call(build::load("f"), vec![build::load("a").into()], keywords);
    let rules = RuleSet::new().with_rule(shout()?);

    let out = rewrite(&tree, &rules, &Bindings::new(), None)?;
    assert_eq!(out.to_source()?, "F(A, key=K)");
    Ok(())
}

#[test]
fn test_rewritten_tree_keeps_schema() -> anyhow::Result<()> {
    let rules = RuleSet::new().with_rule(shout()?);
    let out = rewrite(&sum("a", "b"), &rules, &Bindings::new(), None)?;

    let node = out.as_node().ok_or_else(|| anyhow!("expected a node"))?;
    assert_eq!(node.kind(), Kind::BinOp);
    let names: Vec<_> = node.fields().map(|(name, _)| name).collect();
    assert_eq!(names, ["left", "op", "right"]);
    Ok(())
}

#[test]
fn test_top_level_mode() -> anyhow::Result<()> {
    let rules = RuleSet::new().with_rule(shout()?);
    let rewriter = Rewriter::new(&rules).mode(MatchMode::TopLevel);

    // Only the root is considered
    let err = rewriter.rewrite(&sum("a", "b"), &Bindings::new()).unwrap_err();
    assert!(matches!(err, RewriteError::NoRuleMatched { kind: Kind::BinOp }));
    assert_eq!(
        err.to_string(),
        "no rule matched the top-level BinOp; try tracing the match"
    );

    let out = rewriter.rewrite(&build::load("a"), &Bindings::new())?;
    assert_eq!(out.to_source()?, "A");
    Ok(())
}

#[test]
fn test_top_level_ambiguity() -> anyhow::Result<()> {
    let rules = RuleSet::new()
        .with_rule(shout()?)
        .with_rule(Rule::new("keep", any_name("id")?, |b: &Bindings| {
            Ok(build::load(b.str("id")?))
        }));
    let err = Rewriter::new(&rules)
        .mode(MatchMode::TopLevel)
        .rewrite(&build::load("a"), &Bindings::new())
        .unwrap_err();

    match &err {
        RewriteError::AmbiguousMatch { kind, rules } => {
            assert_eq!(*kind, Kind::Name);
            assert_eq!(rules, &["shout", "keep"]);
        }
        other => panic!("expected AmbiguousMatch, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "top level is ambiguous; the following rules match: shout, keep"
    );
    Ok(())
}

#[test]
fn test_trace_records_in_visit_order() -> anyhow::Result<()> {
    let rules = RuleSet::new().with_rule(shout()?);
    let mut records: Vec<TraceRecord> = Vec::new();
    let out = Rewriter::new(&rules).rewrite_traced(&sum("a", "b"), &Bindings::new(), &mut records)?;
    assert_eq!(out.to_source()?, "A + B");

    let paths: Vec<_> = records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        [".left.ctx", ".left", ".op", ".right.ctx", ".right", "<root>"]
    );

    match &records[1].outcome {
        TraceOutcome::Matched(found) => {
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].rule, "shout");
            assert_eq!(found[0].candidate, "a");
            assert_eq!(found[0].replacement, "A");
        }
        TraceOutcome::NoMatch => panic!("expected a match at .left"),
    }
    assert_eq!(records[5].outcome, TraceOutcome::NoMatch);

    // Same input, same trace
    let mut again: Vec<TraceRecord> = Vec::new();
    Rewriter::new(&rules).rewrite_traced(&sum("a", "b"), &Bindings::new(), &mut again)?;
    assert_eq!(records, again);
    Ok(())
}

#[test]
fn test_trace_only_never_requires_a_match() -> anyhow::Result<()> {
    let rules = RuleSet::new().with_rule(shout()?);
    let tree = sum("a", "b");
    let mut records: Vec<TraceRecord> = Vec::new();

    let summary = Rewriter::new(&rules)
        .mode(MatchMode::TopLevel)
        .trace(&tree, &Bindings::new(), &mut records)?;
    assert_eq!(records.len(), 6);
    assert_eq!(summary.rewrites, 0);
    assert_eq!(summary.stats("shout").map(|s| s.matches), Some(2));
    Ok(())
}

#[test]
fn test_transform_failure_reports_location() -> anyhow::Result<()> {
    let fail = Rule::new("needs_type", any_name("id")?, |b: &Bindings| {
        let ty = b.str("type")?;
        Ok(build::load(format!("{ty} {}", b.str("id")?)))
    });
    let rules = RuleSet::new().with_rule(fail);

    let err = rewrite(&sum("a", "b"), &rules, &Bindings::new(), None).unwrap_err();
    match &err {
        RewriteError::Transform { rule, path, kind, .. } => {
            assert_eq!(rule, "needs_type");
            assert_eq!(path, ".left");
            assert_eq!(*kind, Kind::Name);
        }
        other => panic!("expected Transform, got {other:?}"),
    }
    assert_eq!(err.missing_binding().map(|m| m.name.as_str()), Some("type"));

    let mut vars = Bindings::new();
    vars.insert("type", "int");
    let out = rewrite(&sum("a", "b"), &rules, &vars, None)?;
    assert_eq!(out.to_source()?, "int a + int b");
    Ok(())
}

#[test]
fn test_external_variables_may_exceed_captures() -> anyhow::Result<()> {
    let rules = RuleSet::new().with_rule(shout()?);
    let vars: Bindings = [("unused", "value"), ("another", "one")].into_iter().collect();
    let out = rewrite(&build::load("a"), &rules, &vars, None)?;
    assert_eq!(out.to_source()?, "A");
    Ok(())
}

#[test]
fn test_duplicate_capture_policies() -> anyhow::Result<()> {
    let same = Pattern::node(
        Kind::BinOp,
        [Pattern::capture("x"), Pattern::leaf(Kind::Add), Pattern::capture("x")],
    )?;
    let double = Rule::new("double", same, |b: &Bindings| {
        Ok(build::bin_op(build::num(2), Kind::Mult, b.get("x")?.clone()))
    });
    let rules = RuleSet::new().with_rule(double);

    let out = rewrite(&sum("a", "a"), &rules, &Bindings::new(), None)?;
    assert_eq!(out.to_source()?, "2 * a");

    let err = rewrite(&sum("a", "b"), &rules, &Bindings::new(), None).unwrap_err();
    assert!(matches!(err, RewriteError::DuplicateCapture { ref rule, ref name } if rule == "double" && name == "x"));

    let out = Rewriter::new(&rules)
        .capture_policy(CapturePolicy::Overwrite)
        .rewrite(&sum("a", "b"), &Bindings::new())?;
    assert_eq!(out.to_source()?, "2 * b");
    Ok(())
}
