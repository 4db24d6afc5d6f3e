/*!
# Rewrite Engine

Rule-based, bottom-up rewriting of [`Node`](crate::ast::Node) trees.

## Overview

A rule pairs a structural [`Pattern`] with a transform. The [`Rewriter`]
walks a tree children-first; at each node it tests every rule, in order,
against the node as rebuilt from its already-rewritten children, and
replaces the node with the first matching rule's output. Output is never
re-examined in the same pass.

## Architecture

- `patterns`: the pattern language, captures and [`Bindings`]
- `rules`: the [`TransformationRule`] trait, closure-backed [`Rule`] and ordered [`RuleSet`]
- `rewriter`: traversal, match modes and per-call statistics
- `trace`: match trace records and sinks
- `c_rules`: a bundled rule collection that lowers small functions to C-like text

## Example Usage

```rust
use transpiler_core::ast::{build, Kind, ToSource};
use transpiler_core::rewrite::{Bindings, Pattern, Rewriter, Rule, RuleSet};

let double = Rule::new(
    "double",
    Pattern::node(Kind::BinOp, [
        Pattern::capture("x"),
        Pattern::leaf(Kind::Mult),
        Pattern::from(build::num(2)),
    ])?,
    |b: &Bindings| Ok(build::bin_op(b.get("x")?.clone(), Kind::Add, b.get("x")?.clone())),
);
let rules = RuleSet::new().with_rule(double);

let tree = build::bin_op(build::load("y"), Kind::Mult, build::num(2));
let out = Rewriter::new(&rules).rewrite(&tree, &Bindings::new())?;
assert_eq!(out.to_source()?, "y + y");
# Ok::<(), anyhow::Error>(())
```
*/

pub mod c_rules;
pub mod errors;
pub mod patterns;
pub mod rewriter;
pub mod rules;
pub mod trace;

use std::fmt;

pub use errors::{DuplicateCaptureError, MissingBindingError, RewriteError};
pub use patterns::{matches, Bindings, CapturePolicy, Constraint, Pattern};
pub use rewriter::{rewrite, MatchMode, RewriteSummary, Rewriter, Rewritten};
pub use rules::{Match, Rule, RuleSet, RuleStats, TransformationRule};
pub use trace::{TraceMatch, TraceOutcome, TraceRecord, TraceSink, WriteSink};

/// Result type for rule transforms.
pub type TransformResult<T> = anyhow::Result<T>;

/// One step from a parent value to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(&'static str),
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(key) => write!(f, "['{key}']"),
        }
    }
}

/// Where the traversal currently is, relative to the root.
#[derive(Debug, Clone, Default)]
pub struct RewriteContext {
    segments: Vec<PathSegment>,
}

impl RewriteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a child reached through `segment`.
    pub fn descend(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Rendered path, `<root>` at the top.
    pub fn path(&self) -> String {
        if self.segments.is_empty() {
            return "<root>".to_string();
        }
        self.segments.iter().map(ToString::to_string).collect()
    }
}
