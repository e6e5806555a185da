use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::record::Record;
use crate::types::{BatchReport, EvalContext, RuleSet, Summary};

/// Evaluate every rule in `rules` against every record and tally the
/// outcomes per rule.
///
/// Records are evaluated in parallel on the global `rayon` pool. Each worker
/// folds into its own tallies, which are then merged, so the result does not
/// depend on scheduling.
#[instrument(skip_all, fields(rules = rules.len(), records = records.len()))]
pub fn run_batch<R: Record + Sync>(rules: &RuleSet, records: &[R], ctx: &EvalContext) -> BatchReport {
    let empty = || vec![Summary::new(); rules.len()];

    let tallies = records
        .par_iter()
        .fold(empty, |mut tallies, record| {
            for (tally, rule) in tallies.iter_mut().zip(rules) {
                tally.record(&rule.evaluate(record, ctx));
            }
            tallies
        })
        .reduce(empty, |mut left, right| {
            for (l, r) in left.iter_mut().zip(&right) {
                l.merge(r);
            }
            left
        });

    let summaries: BTreeMap<String, Summary> = rules
        .iter()
        .zip(tallies)
        .map(|(rule, summary)| (rule.id().to_owned(), summary))
        .collect();
    debug!(records = records.len(), "batch complete");
    BatchReport::new(summaries, records.len())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{RuleSetBuilder, XmlDocument};

    const DOC: &str = r#"<iati-activities>
        <iati-activity><title>One</title><activity-status code="2"/></iati-activity>
        <iati-activity><activity-status code="1"/></iati-activity>
        <iati-activity><title>Three</title><activity-status code="x"/></iati-activity>
    </iati-activities>"#;

    fn ctx() -> EvalContext {
        EvalContext::new(NaiveDate::from_ymd_opt(2015, 12, 1).unwrap())
    }

    #[test]
    fn tallies_per_rule() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let rules = RuleSetBuilder::new()
            .rule("title", "`title` should be present")
            .rule(
                "conditional",
                "if `activity-status/@code` is at least 2 then `title` should be present",
            )
            .compile()
            .unwrap();

        let report = run_batch(&rules, &doc.activities(), &ctx());
        assert_eq!(report.records(), 3);

        let title = report.summary("title").unwrap();
        assert_eq!((title.pass(), title.fail()), (2, 1));

        let conditional = report.summary("conditional").unwrap();
        assert_eq!(conditional.pass(), 1);
        assert_eq!(conditional.not_relevant(), 1);
        assert_eq!(conditional.error(), 1);
        assert_eq!(conditional.total(), 3);
    }

    #[test]
    fn empty_batch() {
        let rules = RuleSetBuilder::new()
            .rule("title", "`title` should be present")
            .compile()
            .unwrap();
        let records: Vec<crate::XmlNode<'_>> = Vec::new();
        let report = run_batch(&rules, &records, &ctx());
        assert_eq!(report.records(), 0);
        assert_eq!(report.summary("title").map(Summary::total), Some(0));
    }
}
