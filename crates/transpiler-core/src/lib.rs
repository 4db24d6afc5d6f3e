//! # Transpiler Core
//!
//! Rule-based rewriting of syntax trees into text, including:
//! - A schema-checked tree model with synthetic group and template output nodes
//! - A structural pattern language with typed captures
//! - A bottom-up rewrite engine with match tracing
//! - A parser for a small Python-like source language
//! - A bundled rule collection that lowers functions to C-like text
//!
//! ```rust
//! use transpiler_core::rewrite::c_rules;
//! use transpiler_core::Transpiler;
//!
//! let transpiler = Transpiler::parse("def half(n):\n    return n / 2\n", c_rules::rules()?)?;
//! let vars = c_rules::variables("double", [("n", "double")]);
//! assert_eq!(
//!     transpiler.transform(&vars)?,
//!     "double half(double n) {\n    return n / 2;\n}"
//! );
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(clippy::all)]

pub mod ast;
pub mod parser;
pub mod rewrite;
pub mod transpiler;

// Re-export commonly used types
pub use ast::{Group, Kind, Node, Printer, PrinterConfig, RenderError, SchemaError, ToSource, Value};
pub use parser::{parse_function, AcquisitionError};
pub use rewrite::{
    Bindings, CapturePolicy, MatchMode, Pattern, RewriteError, Rewriter, Rule, RuleSet,
    TraceRecord, TraceSink, TransformResult, TransformationRule,
};
pub use transpiler::{TranspileError, Transpiler, TranspilerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a stderr `tracing` subscriber for the transpiler.
///
/// `RUST_LOG` takes precedence; otherwise `transpiler_core` logs at `info`,
/// or `debug` when `debug` is set. Calling this more than once is harmless.
pub fn init_tracing(debug: bool) {
    let default = if debug {
        "transpiler_core=debug"
    } else {
        "transpiler_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
