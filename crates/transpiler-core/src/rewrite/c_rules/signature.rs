/*!
# Function Signatures

Lowers a function definition to a braced C block and each parameter to a
typed declaration.
*/

use anyhow::anyhow;

use crate::ast::{template, Group, Kind, SchemaError, Value};
use crate::rewrite::patterns::{Bindings, Constraint, Pattern};
use crate::rewrite::rules::TransformationRule;
use crate::rewrite::TransformResult;

/// `def name(args): body` to `rettype name(args) { body }`
///
/// Decorated functions are left alone.
pub struct FunctionSignature {
    pattern: Pattern,
}

impl FunctionSignature {
    pub fn new() -> Result<Self, SchemaError> {
        let pattern = Pattern::node(
            Kind::FunctionDef,
            [
                Pattern::capture_as("name", [Constraint::Str]),
                Pattern::capture_as("args", [Constraint::AnyNode]),
                Pattern::capture_as("body", [Constraint::List]),
                Pattern::seq([]),
            ],
        )?;
        Ok(Self { pattern })
    }
}

impl TransformationRule for FunctionSignature {
    fn name(&self) -> &str {
        "function_signature"
    }

    fn description(&self) -> &str {
        "Emits a C function header and braces around the body"
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, bindings: &Bindings) -> TransformResult<Value> {
        let header = template(
            "{0} {1}({2:node}) {{",
            vec![
                bindings.get("rettype")?.clone(),
                bindings.get("name")?.clone(),
                bindings.get("args")?.clone(),
            ],
        );
        Ok(Group::new()
            .before(header)
            .body(bindings.list("body")?.iter().cloned())
            .after("}")
            .into())
    }
}

/// Parameter `x` to `type x`, the type coming from `argtype[x]`
pub struct TypedParameter {
    pattern: Pattern,
}

impl TypedParameter {
    pub fn new() -> Result<Self, SchemaError> {
        let pattern = Pattern::node(
            Kind::Name,
            [
                Pattern::capture_as("name", [Constraint::Str]),
                Pattern::leaf(Kind::Param),
            ],
        )?;
        Ok(Self { pattern })
    }
}

impl TransformationRule for TypedParameter {
    fn name(&self) -> &str {
        "typed_parameter"
    }

    fn description(&self) -> &str {
        "Prefixes each parameter with its declared type"
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, bindings: &Bindings) -> TransformResult<Value> {
        let name = bindings.str("name")?;
        let types = bindings.get("argtype")?;
        let types = types
            .as_map()
            .ok_or_else(|| anyhow!("`argtype` must map parameter names to types, got {}", types.type_name()))?;

        let ty = match (types.get(name), bindings.lookup("default_type")) {
            (Some(ty), _) | (None, Some(ty)) => ty.clone(),
            (None, None) => return Err(anyhow!("no type declared for parameter `{name}`")),
        };
        Ok(template("{0} {1}", vec![ty, Value::from(name)]).into())
    }
}
