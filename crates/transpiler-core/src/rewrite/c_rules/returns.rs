use crate::ast::{build, template, Kind, SchemaError, Value};
use crate::rewrite::patterns::{Bindings, Constraint, Pattern};
use crate::rewrite::rules::TransformationRule;
use crate::rewrite::TransformResult;

/// `return value` to `return value;`
///
/// A bare `return` has no value to terminate and is not matched.
pub struct TerminatedReturn {
    pattern: Pattern,
}

impl TerminatedReturn {
    pub fn new() -> Result<Self, SchemaError> {
        let pattern = Pattern::node(
            Kind::Return,
            [Pattern::capture_as("value", [Constraint::AnyNode])],
        )?;
        Ok(Self { pattern })
    }
}

impl TransformationRule for TerminatedReturn {
    fn name(&self) -> &str {
        "terminated_return"
    }

    fn description(&self) -> &str {
        "Appends a semicolon to returned expressions"
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, bindings: &Bindings) -> TransformResult<Value> {
        let value = bindings.get("value")?.clone();
        Ok(build::ret(template("{0:node};", vec![value])).into())
    }
}
