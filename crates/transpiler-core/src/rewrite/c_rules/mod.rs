/*!
# C Lowering Rules

Rules that turn a small numeric Python-like function into C-like source.

External variables:
- `rettype`: the function's return type
- `argtype`: mapping from parameter name to type
- `default_type` (optional): type for parameters missing from `argtype`

```rust
use transpiler_core::rewrite::{c_rules, Rewriter};
use transpiler_core::{parser, ToSource};

let tree = parser::parse_function("def sqr(x, y):\n    return x**2 + y\n")?;
let rules = c_rules::rules()?;
let vars = c_rules::variables("double", [("x", "double"), ("y", "int")]);
let out = Rewriter::new(&rules).rewrite(&tree, &vars)?;
assert_eq!(
    out.to_source()?,
    "double sqr(double x, int y) {\n    return x * x + y;\n}"
);
# Ok::<(), anyhow::Error>(())
```
*/

pub mod power;
pub mod returns;
pub mod signature;

pub use power::{PowerCall, Square};
pub use returns::TerminatedReturn;
pub use signature::{FunctionSignature, TypedParameter};

use indexmap::IndexMap;

use crate::ast::{SchemaError, Value};

use super::patterns::Bindings;
use super::rules::RuleSet;

/// All C lowering rules, in tie-break order.
pub fn rules() -> Result<RuleSet, SchemaError> {
    Ok(RuleSet::new()
        .with_rule(FunctionSignature::new()?)
        .with_rule(TypedParameter::new()?)
        .with_rule(TerminatedReturn::new()?)
        .with_rule(Square::new()?)
        .with_rule(PowerCall::new()?))
}

/// External variables for [`rules`].
pub fn variables<I, K, V>(rettype: &str, argtypes: I) -> Bindings
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let argtype: IndexMap<String, Value> = argtypes
        .into_iter()
        .map(|(name, ty)| (name.into(), Value::Str(ty.into())))
        .collect();

    let mut vars = Bindings::new();
    vars.insert("rettype", rettype);
    vars.insert("argtype", argtype);
    vars
}
