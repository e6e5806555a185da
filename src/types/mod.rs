mod codelist;
mod context;
mod error;
mod expr;
mod report;
mod rule;
mod ruleset;
mod verdict;

pub use codelist::{Codelist, Codelists};
pub use context::EvalContext;
pub use error::{CompileError, EvalError};
pub use expr::{Expr, Operand, PathRef, Pattern, Period, Phrasing, Quantifier};
pub use report::{ActivityResult, BatchReport, Summary};
pub use rule::{CompiledRule, Rule};
pub use ruleset::{RuleSet, RuleSetBuilder};
pub use verdict::{Outcome, Verdict};
