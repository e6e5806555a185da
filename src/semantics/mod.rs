//! Operator semantics.
//!
//! Each function receives values already resolved from the record (path
//! lookups are the evaluator's job) and returns an [`Outcome`]: a verdict and
//! the explanation for it. Functions are pure; the reference date for
//! temporal operators is always passed in.
//!
//! [`Outcome`]: crate::Outcome

pub mod codelist;
pub mod compare;
pub mod dates;
pub mod logic;
pub mod presence;

