//! High-level front end: acquire a tree once, then rewrite and render it
//! with a fixed rule set.

use thiserror::Error;
use tracing::info;

use crate::ast::{dump::dump, Node, Printer, PrinterConfig, RenderError, Value};
use crate::parser::{self, AcquisitionError};
use crate::rewrite::{
    Bindings, CapturePolicy, MatchMode, RewriteError, Rewriter, RuleSet, TraceSink, WriteSink,
};

#[derive(Debug, Error)]
pub enum TranspileError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Transpiler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranspilerConfig {
    pub mode: MatchMode,
    pub capture_policy: CapturePolicy,
    pub printer: PrinterConfig,
}

/// A function tree paired with the rules that rewrite it.
#[derive(Debug)]
pub struct Transpiler {
    ast: Node,
    rules: RuleSet,
    config: TranspilerConfig,
    printer: Printer,
}

impl Transpiler {
    /// Parse `text`, which must define exactly one function or lambda.
    pub fn parse(text: &str, rules: RuleSet) -> Result<Self, TranspileError> {
        let ast = parser::parse_function(text)?;
        info!(kind = %ast.kind(), rules = rules.len(), "acquired function");
        Ok(Self::with_tree(ast, rules))
    }

    /// Start from an already-built tree, validated like parsed source.
    pub fn from_tree(tree: Node, rules: RuleSet) -> Result<Self, TranspileError> {
        Ok(Self::with_tree(parser::acquire(tree)?, rules))
    }

    fn with_tree(ast: Node, rules: RuleSet) -> Self {
        Self {
            ast,
            rules,
            config: TranspilerConfig::default(),
            printer: Printer::default(),
        }
    }

    pub fn with_config(mut self, config: TranspilerConfig) -> Self {
        self.printer = Printer::new(config.printer.clone());
        self.config = config;
        self
    }

    pub fn ast(&self) -> &Node {
        &self.ast
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &TranspilerConfig {
        &self.config
    }

    /// Parameter names in declaration order, including `*args`/`**kwargs`.
    pub fn parameter_names(&self) -> Vec<&str> {
        let Some(args) = self.ast.field("args").and_then(Value::as_node) else {
            return Vec::new();
        };
        let positional = args
            .field("args")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|arg| arg.as_node()?.field("id")?.as_str());
        let star = ["vararg", "kwarg"]
            .into_iter()
            .filter_map(|name| args.field(name)?.as_str());
        positional.chain(star).collect()
    }

    /// The acquired tree as indented dump text.
    pub fn tree(&self) -> String {
        dump(&Value::Node(self.ast.clone()))
    }

    /// The acquired tree rendered back to source.
    pub fn source(&self) -> Result<String, TranspileError> {
        Ok(self.printer.render_node(&self.ast)?)
    }

    pub fn rewriter(&self) -> Rewriter<'_> {
        Rewriter::new(&self.rules)
            .mode(self.config.mode)
            .capture_policy(self.config.capture_policy)
            .printer(self.printer.clone())
    }

    pub fn rewrite(&self, vars: &Bindings) -> Result<Value, TranspileError> {
        Ok(self.rewriter().rewrite(&self.ast, vars)?)
    }

    /// Rewrite and render.
    pub fn transform(&self, vars: &Bindings) -> Result<String, TranspileError> {
        let value = self.rewrite(vars)?;
        Ok(self.printer.render(&value)?)
    }

    /// Rewrite and render, sending the match trace to `sink`.
    pub fn transform_traced(
        &self,
        vars: &Bindings,
        sink: &mut dyn TraceSink,
    ) -> Result<String, TranspileError> {
        let value = self.rewriter().rewrite_traced(&self.ast, vars, sink)?;
        Ok(self.printer.render(&value)?)
    }

    /// What every rule would do at every node, one line per node.
    pub fn trace(&self, vars: &Bindings) -> Result<String, TranspileError> {
        let mut sink = WriteSink::new(Vec::new());
        let summary = self.rewriter().trace(&self.ast, vars, &mut sink)?;
        info!(%summary, "traced");
        Ok(String::from_utf8_lossy(&sink.into_inner()).into_owned())
    }
}

/// Rewrite `tree` bottom-up and render the result.
pub fn transform(
    tree: &Node,
    rules: &RuleSet,
    vars: &Bindings,
    sink: Option<&mut dyn TraceSink>,
) -> Result<String, TranspileError> {
    let value = crate::rewrite::rewrite(tree, rules, vars, sink)?;
    Ok(Printer::default().render(&value)?)
}

/// Trace-only traversal of `tree` with no external variables.
pub fn trace(tree: &Node, rules: &RuleSet) -> Result<String, TranspileError> {
    let mut sink = WriteSink::new(Vec::new());
    Rewriter::new(rules).trace(tree, &Bindings::new(), &mut sink)?;
    Ok(String::from_utf8_lossy(&sink.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::rewrite::c_rules;
    use pretty_assertions::assert_eq;

    const SQR: &str = "def sqr(x, y):\n    return x**2 + y\n";

    #[test]
    fn test_transform_sqr() {
        let transpiler = Transpiler::parse(SQR, c_rules::rules().unwrap()).unwrap();
        let vars = c_rules::variables("double", [("x", "double"), ("y", "int")]);
        assert_eq!(
            transpiler.transform(&vars).unwrap(),
            "double sqr(double x, int y) {\n    return x * x + y;\n}"
        );
    }

    #[test]
    fn test_parameter_names() {
        let transpiler = Transpiler::parse(
            "def f(a, b=1, *rest, **extra):\n    pass",
            RuleSet::new(),
        )
        .unwrap();
        assert_eq!(transpiler.parameter_names(), ["a", "b", "rest", "extra"]);
    }

    #[test]
    fn test_source_and_tree() {
        let transpiler = Transpiler::parse(SQR, RuleSet::new()).unwrap();
        assert_eq!(transpiler.source().unwrap(), "def sqr(x, y):\n    return x ** 2 + y");
        assert!(transpiler.tree().starts_with("FunctionDef"));
    }

    #[test]
    fn test_from_tree_rejects_expression() {
        let err = Transpiler::from_tree(build::load("x"), RuleSet::new()).unwrap_err();
        assert!(matches!(err, TranspileError::Acquisition(AcquisitionError::NotAFunction { .. })));
    }

    #[test]
    fn test_custom_indent() {
        let config = TranspilerConfig {
            printer: PrinterConfig {
                indent: "\t".to_string(),
            },
            ..TranspilerConfig::default()
        };
        let transpiler = Transpiler::parse(SQR, c_rules::rules().unwrap())
            .unwrap()
            .with_config(config);
        let vars = c_rules::variables("float", [("x", "float"), ("y", "float")]);
        assert_eq!(
            transpiler.transform(&vars).unwrap(),
            "float sqr(float x, float y) {\n\treturn x * x + y;\n}"
        );
    }
}
