use std::fmt;

use super::context::EvalContext;
use super::expr::Expr;
use super::verdict::Outcome;
use crate::record::Record;

/// A rule as loaded: a stable identifier and its statement text.
///
/// Compile rules with [`RuleSetBuilder`](super::RuleSetBuilder) or
/// [`compile_all`](crate::compile_all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub expression: String,
}

impl Rule {
    #[must_use]
    pub fn new(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expression: expression.into(),
        }
    }
}

/// A rule whose statement has been compiled into an [`Expr`] tree.
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub(crate) id: String,
    pub(crate) source: String,
    pub(crate) expr: Expr,
}

impl CompiledRule {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The normalised statement text the tree was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate this rule against one record.
    pub fn evaluate<R: Record>(&self, record: &R, ctx: &EvalContext) -> Outcome {
        crate::evaluate::evaluate(&self.expr, record, ctx)
    }
}

impl fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.expr)
    }
}
