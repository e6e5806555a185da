use chrono::{NaiveDate, Utc};

/// Evaluation-wide settings shared by every rule and record in a run.
///
/// Date operators compare against [`today`](Self::today) rather than reading
/// the clock, so a fixed context makes evaluation reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    today: NaiveDate,
}

impl EvalContext {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// A context whose reference date is the current UTC calendar day.
    #[must_use]
    pub fn today_utc() -> Self {
        Self::new(Utc::now().date_naive())
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::today_utc()
    }
}
