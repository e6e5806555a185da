//! The query boundary between compiled rules and the data they check.
//!
//! Rules only ever see records through [`Record`]: path text captured from
//! backticks is parsed once at compile time and handed to the record as a
//! [`PathRef`], and the record decides what it matches. [`XmlDocument`]
//! provides the reference implementation over XML.

mod path;
mod xml;

use thiserror::Error;

pub use path::{PathExpr, PathSyntaxError};
pub use xml::{XmlDocument, XmlError, XmlNode};

use crate::types::PathRef;

/// One unit of data that rules are evaluated against.
///
/// Implementations must be pure: querying never mutates the record.
pub trait Record: Sized {
    /// Evaluate `path` and return the string value of every match, in
    /// document order.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the path cannot be parsed or resolved.
    fn query(&self, path: &PathRef) -> Result<Vec<String>, QueryError>;

    /// Evaluate `path` and return the matched sub-records, in order.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the path cannot be parsed, or if it selects
    /// something that is not itself a record.
    fn select(&self, path: &PathRef) -> Result<Vec<Self>, QueryError>;

    /// Whether `path` matches anything that counts as present.
    ///
    /// By default a match is present when its string value is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the path cannot be parsed or resolved.
    fn present(&self, path: &PathRef) -> Result<bool, QueryError> {
        Ok(self.query(path)?.iter().any(|value| !value.is_empty()))
    }
}

/// Failures raised by a [`Record`] while resolving a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid path `{path}`: {source}")]
    Syntax {
        path: String,
        #[source]
        source: PathSyntaxError,
    },

    #[error("path `{path}` selects a value that is not an element")]
    NotAnElement { path: String },
}
