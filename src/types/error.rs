use thiserror::Error;

use crate::parse::GrammarError;
use crate::record::QueryError;

/// Compile-time failures. Each one is fatal for the named rule only.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot compile rule '{rule}': {source}")]
    Grammar {
        rule: String,
        #[source]
        source: GrammarError,
    },

    #[error("rule '{rule}' references undeclared codelist '{name}'")]
    CodelistNotFound { rule: String, name: String },

    #[error("invalid regex in rule '{rule}': `{pattern}`: {reason}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        reason: String,
    },

    #[error("invalid path in rule '{rule}': `{path}`: {reason}")]
    InvalidPath {
        rule: String,
        path: String,
        reason: String,
    },

    #[error("expected {expected} in rule '{rule}', found '{text}'")]
    UnexpectedOperand {
        rule: String,
        text: String,
        expected: &'static str,
    },

    #[error("invalid literal '{text}' in rule '{rule}'")]
    InvalidLiteral { rule: String, text: String },

    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },
}

impl CompileError {
    /// Name of the rule that failed to compile.
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            CompileError::Grammar { rule, .. }
            | CompileError::CodelistNotFound { rule, .. }
            | CompileError::InvalidPattern { rule, .. }
            | CompileError::InvalidPath { rule, .. }
            | CompileError::UnexpectedOperand { rule, .. }
            | CompileError::InvalidLiteral { rule, .. } => rule,
            CompileError::DuplicateRule { name } => name,
        }
    }
}

/// Runtime failure of one operator against one record. Contained at the
/// nearest verdict node and never propagated past the record boundary.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("'{value}' from {path} is not an integer")]
    NotAnInteger { path: String, value: String },
}
