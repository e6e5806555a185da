use thiserror::Error;

use crate::parse::GrammarError;
use crate::record::{QueryError, XmlError};
use crate::types::{CompileError, EvalError};

/// Unified error type covering compilation, document loading, queries, and
/// I/O.
#[derive(Debug, Error)]
pub enum FoxpathError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
