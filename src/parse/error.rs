use std::fmt;

/// No grammar entry matched the given text.
///
/// `text` is the unmatched fragment, which may be a sub-expression of the
/// rule rather than the whole statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    text: String,
}

impl GrammarError {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I don't understand {}", self.text)
    }
}

impl std::error::Error for GrammarError {}
