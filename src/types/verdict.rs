use std::fmt;

/// Three-valued result of evaluating a rule against one record.
///
/// `NotRelevant` means the rule's precondition did not hold. It is neither a
/// pass nor a failure and is excluded from pass-rate calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Fail,
    NotRelevant,
}

impl Verdict {
    #[must_use]
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    #[must_use]
    pub fn is_fail(self) -> bool {
        self == Verdict::Fail
    }

    pub(crate) fn from_bool(result: bool) -> Self {
        if result {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
            Verdict::NotRelevant => write!(f, "not-relevant"),
        }
    }
}

/// A verdict together with the human-readable reason for it.
///
/// `errored` is set when an evaluation error was contained somewhere in the
/// subtree that determined the verdict. Such outcomes usually carry `Fail`,
/// or `NotRelevant` when the error sat in an `if` condition, and are tallied
/// separately from genuine results.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Outcome {
    verdict: Verdict,
    explanation: String,
    errored: bool,
}

impl Outcome {
    pub fn new(verdict: Verdict, explanation: impl Into<String>) -> Self {
        Self {
            verdict,
            explanation: explanation.into(),
            errored: false,
        }
    }

    pub fn pass(explanation: impl Into<String>) -> Self {
        Self::new(Verdict::Pass, explanation)
    }

    pub fn fail(explanation: impl Into<String>) -> Self {
        Self::new(Verdict::Fail, explanation)
    }

    pub fn not_relevant(explanation: impl Into<String>) -> Self {
        Self::new(Verdict::NotRelevant, explanation)
    }

    pub(crate) fn from_bool(result: bool, explanation: impl Into<String>) -> Self {
        Self::new(Verdict::from_bool(result), explanation)
    }

    /// A failure caused by an evaluation error rather than by the data.
    pub fn error(explanation: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            explanation: explanation.into(),
            errored: true,
        }
    }

    pub(crate) fn with_explanation(mut self, explanation: String) -> Self {
        self.explanation = explanation;
        self
    }

    pub(crate) fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = verdict;
        self
    }

    pub(crate) fn tainted(mut self, errored: bool) -> Self {
        self.errored |= errored;
        self
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.errored
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errored {
            write!(f, "error: {}", self.explanation)
        } else {
            write!(f, "{}: {}", self.verdict, self.explanation)
        }
    }
}
