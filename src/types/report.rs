use std::collections::BTreeMap;
use std::fmt;

use super::verdict::{Outcome, Verdict};

/// Per-rule verdict tallies over a batch of records.
///
/// Every outcome lands in exactly one counter, so
/// `pass + fail + not_relevant + error == total()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pass: usize,
    fail: usize,
    not_relevant: usize,
    error: usize,
}

impl Summary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome. Errored outcomes count only as errors.
    pub fn record(&mut self, outcome: &Outcome) {
        if outcome.is_error() {
            self.error += 1;
            return;
        }
        match outcome.verdict() {
            Verdict::Pass => self.pass += 1,
            Verdict::Fail => self.fail += 1,
            Verdict::NotRelevant => self.not_relevant += 1,
        }
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: &Summary) {
        self.pass += other.pass;
        self.fail += other.fail;
        self.not_relevant += other.not_relevant;
        self.error += other.error;
    }

    #[must_use]
    pub fn pass(&self) -> usize {
        self.pass
    }

    #[must_use]
    pub fn fail(&self) -> usize {
        self.fail
    }

    #[must_use]
    pub fn not_relevant(&self) -> usize {
        self.not_relevant
    }

    #[must_use]
    pub fn error(&self) -> usize {
        self.error
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.pass + self.fail + self.not_relevant + self.error
    }

    /// `pass / (pass + fail)`, or `None` when no record passed or failed.
    #[must_use]
    pub fn pass_rate(&self) -> Option<f64> {
        let decided = self.pass + self.fail;
        if decided == 0 {
            None
        } else {
            Some(self.pass as f64 / decided as f64)
        }
    }

    /// Pass rate as a percentage, `0.0` when undefined.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.pass_rate().map_or(0.0, |rate| rate * 100.0)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass: {}, fail: {}, not-relevant: {}, error: {}",
            self.pass, self.fail, self.not_relevant, self.error
        )?;
        if let Some(rate) = self.pass_rate() {
            write!(f, " ({:.1}%)", rate * 100.0)?;
        }
        Ok(())
    }
}

/// Result of [`run_batch`](crate::run_batch): one [`Summary`] per rule, keyed
/// by rule id.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct BatchReport {
    summaries: BTreeMap<String, Summary>,
    records: usize,
}

impl BatchReport {
    pub(crate) fn new(summaries: BTreeMap<String, Summary>, records: usize) -> Self {
        Self { summaries, records }
    }

    /// Tally for one rule.
    #[must_use]
    pub fn summary(&self, id: &str) -> Option<&Summary> {
        self.summaries.get(id)
    }

    #[must_use]
    pub fn summaries(&self) -> &BTreeMap<String, Summary> {
        &self.summaries
    }

    /// Number of records evaluated.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Fold another report into this one, e.g. for a second document.
    pub fn merge(&mut self, other: &BatchReport) {
        for (id, summary) in &other.summaries {
            self.summaries.entry(id.clone()).or_default().merge(summary);
        }
        self.records += other.records;
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} records", self.records)?;
        for (id, summary) in &self.summaries {
            write!(f, "\n  {id}: {summary}")?;
        }
        Ok(())
    }
}

/// Every rule's outcome for one activity, with the fields that identify
/// the activity in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResult {
    identifier: String,
    hierarchy: String,
    title: Option<String>,
    results: Vec<(String, Outcome)>,
}

impl ActivityResult {
    pub(crate) fn new(
        identifier: String,
        hierarchy: String,
        title: Option<String>,
        results: Vec<(String, Outcome)>,
    ) -> Self {
        Self {
            identifier,
            hierarchy,
            title,
            results,
        }
    }

    /// First `iati-identifier` text, or `"Unknown"`.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The `hierarchy` attribute, or the empty string.
    #[must_use]
    pub fn hierarchy(&self) -> &str {
        &self.hierarchy
    }

    /// First `title/narrative` text, else first plain `title` text.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `(rule id, outcome)` pairs in rule order.
    #[must_use]
    pub fn results(&self) -> &[(String, Outcome)] {
        &self.results
    }

    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|(rule, _)| rule == id)
            .map(|(_, outcome)| outcome)
    }

    /// Tally this activity's outcomes.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::new();
        for (_, outcome) in &self.results {
            summary.record(outcome);
        }
        summary
    }
}

impl fmt::Display for ActivityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)?;
        if let Some(title) = &self.title {
            write!(f, " ({title})")?;
        }
        for (id, outcome) in &self.results {
            write!(f, "\n  {id}: {outcome}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_each_verdict() {
        let mut summary = Summary::new();
        summary.record(&Outcome::pass("a"));
        summary.record(&Outcome::pass("a"));
        summary.record(&Outcome::fail("b"));
        summary.record(&Outcome::not_relevant("c"));
        summary.record(&Outcome::error("d"));
        assert_eq!(summary.pass(), 2);
        assert_eq!(summary.fail(), 1);
        assert_eq!(summary.not_relevant(), 1);
        assert_eq!(summary.error(), 1);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn pass_rate_excludes_not_relevant_and_errors() {
        let mut summary = Summary::new();
        summary.record(&Outcome::pass("a"));
        summary.record(&Outcome::fail("b"));
        summary.record(&Outcome::not_relevant("c"));
        summary.record(&Outcome::error("d"));
        assert_eq!(summary.pass_rate(), Some(0.5));
        assert!((summary.percentage() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pass_rate_undefined_without_decisions() {
        let mut summary = Summary::new();
        summary.record(&Outcome::not_relevant("c"));
        assert_eq!(summary.pass_rate(), None);
        assert_eq!(summary.percentage(), 0.0);
    }

    #[test]
    fn summary_display() {
        let mut summary = Summary::new();
        summary.record(&Outcome::pass("a"));
        summary.record(&Outcome::fail("b"));
        assert_eq!(
            summary.to_string(),
            "pass: 1, fail: 1, not-relevant: 0, error: 0 (50.0%)"
        );
    }

    #[test]
    fn reports_merge() {
        let mut one = Summary::new();
        one.record(&Outcome::pass("a"));
        let mut a = BatchReport::new(BTreeMap::from([("r".to_owned(), one)]), 1);
        let b = BatchReport::new(BTreeMap::from([("r".to_owned(), one)]), 1);
        a.merge(&b);
        assert_eq!(a.records(), 2);
        assert_eq!(a.summary("r").map(Summary::pass), Some(2));
    }

    #[test]
    fn activity_result_lookups() {
        let result = ActivityResult::new(
            "GB-1-001".to_owned(),
            String::new(),
            None,
            vec![
                ("title".to_owned(), Outcome::fail("`title` is not present")),
                ("id".to_owned(), Outcome::pass("`iati-identifier` is present")),
            ],
        );
        assert_eq!(result.identifier(), "GB-1-001");
        assert_eq!(result.title(), None);
        assert!(result.outcome("id").unwrap().verdict().is_pass());
        assert!(result.outcome("budget").is_none());
        assert_eq!(result.summary().fail(), 1);
        assert_eq!(result.summary().pass(), 1);
    }
}
