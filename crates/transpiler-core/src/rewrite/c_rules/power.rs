/*!
# Exponentiation

C has no `**`. Squares become a multiplication, every other power a call
to `pow`. [`Square`] must come first in the rule set since [`PowerCall`]
matches squares too.
*/

use crate::ast::{build, template, Kind, SchemaError, Value};
use crate::rewrite::patterns::{Bindings, Pattern};
use crate::rewrite::rules::TransformationRule;
use crate::rewrite::TransformResult;

/// `base ** 2` to `base * base`
pub struct Square {
    pattern: Pattern,
}

impl Square {
    pub fn new() -> Result<Self, SchemaError> {
        let pattern = Pattern::node(
            Kind::BinOp,
            [
                Pattern::capture("base"),
                Pattern::leaf(Kind::Pow),
                Pattern::from(build::num(2)),
            ],
        )?;
        Ok(Self { pattern })
    }
}

impl TransformationRule for Square {
    fn name(&self) -> &str {
        "square"
    }

    fn description(&self) -> &str {
        "Rewrites squaring as a multiplication"
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, bindings: &Bindings) -> TransformResult<Value> {
        let base = bindings.get("base")?;
        Ok(build::bin_op(base.clone(), Kind::Mult, base.clone()).into())
    }
}

/// `base ** exponent` to `pow(base, exponent)`
pub struct PowerCall {
    pattern: Pattern,
}

impl PowerCall {
    pub fn new() -> Result<Self, SchemaError> {
        let pattern = Pattern::node(
            Kind::BinOp,
            [
                Pattern::capture("base"),
                Pattern::leaf(Kind::Pow),
                Pattern::capture("exponent"),
            ],
        )?;
        Ok(Self { pattern })
    }
}

impl TransformationRule for PowerCall {
    fn name(&self) -> &str {
        "power_call"
    }

    fn description(&self) -> &str {
        "Rewrites exponentiation as a call to pow()"
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, bindings: &Bindings) -> TransformResult<Value> {
        Ok(template(
            "pow({0:node}, {1:node})",
            vec![bindings.get("base")?.clone(), bindings.get("exponent")?.clone()],
        )
        .into())
    }
}
