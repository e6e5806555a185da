//! Plain-English data-quality rules compiled into predicates over records.
//!
//! A rule such as `` `default-aid-type/@code` should be on the AidType codelist ``
//! is compiled once into an [`Expr`] tree and then evaluated against any
//! number of [`Record`]s, yielding an [`Outcome`]: a three-valued
//! [`Verdict`] and an explanation.
//!
//! ```
//! use chrono::NaiveDate;
//! use foxpath::{EvalContext, RuleSetBuilder, Verdict, XmlDocument};
//!
//! let rules = RuleSetBuilder::new()
//!     .codelist("AidType", ["A01"])
//!     .rule("aid-type", "`default-aid-type/@code` is on list AidType")
//!     .compile()
//!     .unwrap();
//!
//! let doc = XmlDocument::parse_str(
//!     r#"<iati-activity><default-aid-type code="a01"/></iati-activity>"#,
//! )
//! .unwrap();
//! let ctx = EvalContext::new(NaiveDate::from_ymd_opt(2015, 12, 1).unwrap());
//! let outcome = rules.evaluate("aid-type", &doc.activities()[0], &ctx).unwrap();
//! assert_eq!(outcome.verdict(), Verdict::Pass);
//! ```

mod batch;
mod compile;
mod error;
mod evaluate;
pub mod parse;
pub mod record;
pub mod semantics;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use batch::run_batch;
pub use compile::{compile, compile_all, compile_rule};
pub use error::FoxpathError;
pub use evaluate::evaluate;
pub use parse::GrammarError;
pub use record::{PathExpr, QueryError, Record, XmlDocument, XmlError, XmlNode};
pub use types::{
    ActivityResult, BatchReport, Codelist, Codelists, CompileError, CompiledRule, EvalContext,
    EvalError, Expr, Operand, Outcome, PathRef, Pattern, Period, Phrasing, Quantifier, Rule,
    RuleSet, RuleSetBuilder, Summary, Verdict,
};
