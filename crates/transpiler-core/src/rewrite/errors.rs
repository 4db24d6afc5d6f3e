use std::io;

use thiserror::Error;

use crate::ast::{Kind, SchemaError};

/// A transform asked for a name that is neither captured nor supplied
/// as an external variable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no binding named `{name}`")]
pub struct MissingBindingError {
    pub name: String,
}

/// The same capture name matched two different values in one pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("capture `{name}` bound twice to different values")]
pub struct DuplicateCaptureError {
    pub name: String,
}

/// Rewrite engine errors. Any of these aborts the whole rewrite call.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("rule `{rule}`: capture `{name}` bound twice to different values")]
    DuplicateCapture { rule: String, name: String },

    #[error("no rule matched the top-level {kind}; try tracing the match")]
    NoRuleMatched { kind: Kind },

    #[error("top level is ambiguous; the following rules match: {}", .rules.join(", "))]
    AmbiguousMatch { kind: Kind, rules: Vec<String> },

    #[error("rule `{rule}` failed on {kind} at {path}")]
    Transform {
        rule: String,
        path: String,
        kind: Kind,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write trace: {0}")]
    Trace(#[from] io::Error),
}

impl RewriteError {
    pub(crate) fn duplicate_capture(rule: &str, err: DuplicateCaptureError) -> Self {
        RewriteError::DuplicateCapture {
            rule: rule.to_string(),
            name: err.name,
        }
    }

    /// The missing name, if this is a transform that failed on an unbound
    /// variable.
    pub fn missing_binding(&self) -> Option<&MissingBindingError> {
        match self {
            RewriteError::Transform { source, .. } => source.downcast_ref(),
            _ => None,
        }
    }
}
