use chrono::{Datelike, Days, Months, NaiveDate};

use crate::types::{Outcome, PathRef, Period};

/// Where an activity's declared end dates live, relative to the activity.
pub const ACTIVITY_END_DATES: &str = concat!(
    r#"activity-date[@type="end-planned"]/@iso-date"#,
    r#"|activity-date[@type="end-actual"]/@iso-date"#,
    r#"|activity-date[@type="3"]/@iso-date"#,
    r#"|activity-date[@type="4"]/@iso-date"#,
);

/// Budget period boundaries, relative to a budget element.
pub const PERIOD_START: &str = "period-start/@iso-date";
pub const PERIOD_END: &str = "period-end/@iso-date";

/// Activities ending sooner than this are not expected to carry a forward
/// budget.
const ESCAPE_DAYS: u64 = 177;

/// Parse a strict `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Pass iff the first date is on or before `today`. Missing or malformed
/// dates are not relevant.
pub fn is_past(path: &PathRef, values: &[String], today: NaiveDate) -> Outcome {
    let Some(raw) = values.first() else {
        return Outcome::not_relevant(format!(
            "{path} is not present, so the test is not relevant"
        ));
    };
    match parse_date(raw) {
        None => Outcome::not_relevant(format!(
            "the date given for {path} ({raw}) does not use the format YYYY-MM-DD, so we can't test if it is in the past"
        )),
        Some(date) if date <= today => {
            Outcome::pass(format!("the date given for {path} ({raw}) is in the past"))
        }
        Some(_) => Outcome::fail(format!("the date given for {path} ({raw}) is in the future")),
    }
}

/// Pass iff the first `earlier` date is on or before the first `later` date.
/// Missing or malformed dates on either side are not relevant.
pub fn is_before(
    earlier: &PathRef,
    earlier_values: &[String],
    later: &PathRef,
    later_values: &[String],
) -> Outcome {
    let (a, b) = match (earlier_values.first(), later_values.first()) {
        (Some(a), Some(b)) => (a, b),
        (None, None) => {
            return Outcome::not_relevant(format!(
                "Neither {earlier} nor {later} are present, so can't determine their ordering"
            ))
        }
        (None, Some(_)) => {
            return Outcome::not_relevant(format!(
                "{earlier} is not present, so can't determine if it is before {later}"
            ))
        }
        (Some(_), None) => {
            return Outcome::not_relevant(format!(
                "{later} is not present, so can't determine if it is before {earlier}"
            ))
        }
    };

    match (parse_date(a), parse_date(b)) {
        (Some(first), Some(second)) => {
            let diff = second.signed_duration_since(first).num_days();
            let direction = if diff >= 0 { "before" } else { "after" };
            Outcome::from_bool(
                diff >= 0,
                format!(
                    "{earlier} ({first}) is {} days {direction} {later} ({second})",
                    diff.abs()
                ),
            )
        }
        (None, None) => Outcome::not_relevant(format!(
            "Neither {earlier} ({a}) nor {later} ({b}) use the format YYYY-MM-DD, so can't determine their ordering"
        )),
        (None, Some(_)) => Outcome::not_relevant(format!(
            "{earlier} ({a}) does not use the format YYYY-MM-DD, so can't determine if it is before {later} ({b})"
        )),
        (Some(_), None) => Outcome::not_relevant(format!(
            "{later} ({b}) does not use the format YYYY-MM-DD, so can't determine if it is after {earlier} ({a})"
        )),
    }
}

/// Pass iff the most recent valid date is less than `months` calendar months
/// before `today`. When the month difference equals `months` exactly, the
/// date passes only if its day of month is later than today's. Future dates
/// pass; missing or malformed dates fail.
pub fn less_than_months_ago(
    path: &PathRef,
    values: &[String],
    months: i64,
    today: NaiveDate,
) -> Outcome {
    let Some(first) = values.first() else {
        return Outcome::fail(format!(
            "{path} is not present, so assuming it is not less than {months} months ago"
        ));
    };
    let valid: Vec<NaiveDate> = values.iter().filter_map(|v| parse_date(v)).collect();
    let (Some(&latest), Some(&earliest)) = (valid.iter().max(), valid.iter().min()) else {
        return Outcome::fail(format!(
            "{path} ({first}) does not use format YYYY-MM-DD, so assuming it is not less than {months} months ago"
        ));
    };
    let prefix = if latest == earliest {
        ""
    } else {
        "the most recent "
    };

    if latest > today {
        return Outcome::pass(format!("{prefix}{path} ({latest}) is in the future"));
    }

    let month_diff = 12 * i64::from(today.year() - latest.year()) + i64::from(today.month())
        - i64::from(latest.month());
    let recent = if month_diff == months {
        latest.day() > today.day()
    } else {
        month_diff < months
    };
    if recent {
        Outcome::pass(format!(
            "{prefix}{path} ({latest}) is less than {months} months ago"
        ))
    } else {
        Outcome::fail(format!(
            "{prefix}{path} ({latest}) is not less than {months} months ago"
        ))
    }
}

/// The dates of one budget element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetPeriod {
    pub starts: Vec<String>,
    pub ends: Vec<String>,
}

impl BudgetPeriod {
    #[must_use]
    pub fn new(starts: Vec<String>, ends: Vec<String>) -> Self {
        Self { starts, ends }
    }

    /// Some boundary of the period falls on or after `today`.
    fn reaches(&self, today: NaiveDate) -> bool {
        self.starts
            .iter()
            .chain(&self.ends)
            .filter_map(|d| parse_date(d))
            .any(|d| d >= today)
    }

    /// The first start and first end both parse and span at most `max_days`.
    fn spans_at_most(&self, max_days: i64) -> bool {
        let start = self.starts.first().and_then(|d| parse_date(d));
        let end = self.ends.first().and_then(|d| parse_date(d));
        match (start, end) {
            (Some(start), Some(end)) => end.signed_duration_since(start).num_days() <= max_days,
            _ => false,
        }
    }
}

/// Pass iff some budget reaches today or later and spans no more than the
/// period allows. Activities ending within the escape window are not
/// relevant; an activity with no valid end date is treated as ending a year
/// from today.
pub fn available_forward(
    path: &PathRef,
    period: Period,
    end_dates: &[String],
    budgets: &[BudgetPeriod],
    today: NaiveDate,
) -> Outcome {
    let default_end = today
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX);
    let end = end_dates
        .iter()
        .filter_map(|d| parse_date(d))
        .max()
        .unwrap_or(default_end);
    let escape = today
        .checked_add_days(Days::new(ESCAPE_DAYS))
        .unwrap_or(NaiveDate::MAX);
    if end < escape {
        return Outcome::not_relevant(format!(
            "activity is ending soon ({end}) so we do not expect a budget"
        ));
    }

    let max_days = period.max_days();
    let available = budgets
        .iter()
        .any(|b| b.reaches(today) && b.spans_at_most(max_days));
    if available {
        Outcome::pass(format!("{path} is available forward {period}"))
    } else {
        Outcome::fail(format!("{path} is not available forward {period}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Verdict;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vals(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn p(q: &str) -> PathRef {
        PathRef::new(q)
    }

    #[test]
    fn strict_date_format() {
        assert_eq!(parse_date("2014-01-05"), Some(date(2014, 1, 5)));
        assert_eq!(parse_date("2014-1-5"), None);
        assert_eq!(parse_date("2014-02-30"), None);
        assert_eq!(parse_date("2014-01-05T00:00:00"), None);
        assert_eq!(parse_date("05/01/2014"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn is_past_cases() {
        let today = date(2015, 12, 1);
        let path = p("activity-date/@iso-date");
        assert_eq!(is_past(&path, &vals(&["2015-12-01"]), today).verdict(), Verdict::Pass);
        let future = is_past(&path, &vals(&["2015-12-02"]), today);
        assert_eq!(future.verdict(), Verdict::Fail);
        assert_eq!(
            future.explanation(),
            "the date given for `activity-date/@iso-date` (2015-12-02) is in the future"
        );
        assert_eq!(is_past(&path, &[], today).verdict(), Verdict::NotRelevant);
        assert_eq!(is_past(&path, &vals(&["soon"]), today).verdict(), Verdict::NotRelevant);
    }

    #[test]
    fn is_before_orders_dates() {
        let start = p("start");
        let end = p("end");
        let ok = is_before(&start, &vals(&["2014-01-01"]), &end, &vals(&["2014-01-11"]));
        assert_eq!(ok.verdict(), Verdict::Pass);
        assert_eq!(ok.explanation(), "`start` (2014-01-01) is 10 days before `end` (2014-01-11)");

        let same = is_before(&start, &vals(&["2014-01-01"]), &end, &vals(&["2014-01-01"]));
        assert_eq!(same.verdict(), Verdict::Pass);

        let bad = is_before(&start, &vals(&["2014-01-11"]), &end, &vals(&["2014-01-01"]));
        assert_eq!(bad.verdict(), Verdict::Fail);
        assert_eq!(bad.explanation(), "`start` (2014-01-11) is 10 days after `end` (2014-01-01)");
    }

    #[test]
    fn is_before_degrades_to_not_relevant() {
        let start = p("start");
        let end = p("end");
        assert_eq!(
            is_before(&start, &[], &end, &vals(&["2014-01-01"])).verdict(),
            Verdict::NotRelevant
        );
        assert_eq!(
            is_before(&start, &vals(&["2014-01-01"]), &end, &[]).verdict(),
            Verdict::NotRelevant
        );
        let malformed = is_before(&start, &vals(&["2014"]), &end, &vals(&["2014-01-01"]));
        assert_eq!(malformed.verdict(), Verdict::NotRelevant);
        assert_eq!(
            malformed.explanation(),
            "`start` (2014) does not use the format YYYY-MM-DD, so can't determine if it is before `end` (2014-01-01)"
        );
    }

    #[test]
    fn months_ago_day_of_month_boundary() {
        let today = date(2015, 12, 1);
        let path = p("transaction-date/@iso-date");
        let same_day = less_than_months_ago(&path, &vals(&["2014-11-01"]), 13, today);
        assert_eq!(same_day.verdict(), Verdict::Fail);
        let day_later = less_than_months_ago(&path, &vals(&["2014-11-02"]), 13, today);
        assert_eq!(day_later.verdict(), Verdict::Pass);
        assert_eq!(
            day_later.explanation(),
            "`transaction-date/@iso-date` (2014-11-02) is less than 13 months ago"
        );
    }

    #[test]
    fn months_ago_uses_most_recent_date() {
        let today = date(2015, 12, 1);
        let outcome = less_than_months_ago(
            &p("d"),
            &vals(&["2010-01-01", "junk", "2015-06-30"]),
            13,
            today,
        );
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(
            outcome.explanation(),
            "the most recent `d` (2015-06-30) is less than 13 months ago"
        );
    }

    #[test]
    fn months_ago_future_and_missing() {
        let today = date(2015, 12, 1);
        let future = less_than_months_ago(&p("d"), &vals(&["2016-01-01"]), 1, today);
        assert_eq!(future.verdict(), Verdict::Pass);
        assert_eq!(future.explanation(), "`d` (2016-01-01) is in the future");
        assert_eq!(less_than_months_ago(&p("d"), &[], 13, today).verdict(), Verdict::Fail);
        let malformed = less_than_months_ago(&p("d"), &vals(&["2015"]), 13, today);
        assert_eq!(malformed.verdict(), Verdict::Fail);
        assert_eq!(
            malformed.explanation(),
            "`d` (2015) does not use format YYYY-MM-DD, so assuming it is not less than 13 months ago"
        );
    }

    fn budget(start: &str, end: &str) -> BudgetPeriod {
        BudgetPeriod::new(vals(&[start]), vals(&[end]))
    }

    #[test]
    fn available_forward_escape_window() {
        let today = date(2015, 12, 1);
        let ends = vals(&["2016-03-01"]);
        let outcome = available_forward(
            &p("budget"),
            Period::Annually,
            &ends,
            &[budget("2016-01-01", "2016-12-31")],
            today,
        );
        assert_eq!(outcome.verdict(), Verdict::NotRelevant);
        assert_eq!(
            outcome.explanation(),
            "activity is ending soon (2016-03-01) so we do not expect a budget"
        );
    }

    #[test]
    fn available_forward_defaults_end_to_a_year_out() {
        let today = date(2015, 12, 1);
        let outcome = available_forward(
            &p("budget"),
            Period::Annually,
            &[],
            &[budget("2016-01-01", "2016-12-31")],
            today,
        );
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(outcome.explanation(), "`budget` is available forward annually");
    }

    #[test]
    fn available_forward_checks_span() {
        let today = date(2015, 12, 1);
        let ends = vals(&["2018-01-01"]);
        let annual = [budget("2016-01-01", "2016-12-31")];
        assert_eq!(
            available_forward(&p("budget"), Period::Quarterly, &ends, &annual, today).verdict(),
            Verdict::Fail
        );
        let quarter = [budget("2016-01-01", "2016-03-31")];
        assert_eq!(
            available_forward(&p("budget"), Period::Quarterly, &ends, &quarter, today).verdict(),
            Verdict::Pass
        );
    }

    #[test]
    fn available_forward_ignores_past_and_incomplete_budgets() {
        let today = date(2015, 12, 1);
        let ends = vals(&["2018-01-01"]);
        let budgets = [
            budget("2014-01-01", "2014-12-31"),
            BudgetPeriod::new(vals(&["2016-01-01"]), vec![]),
        ];
        let outcome = available_forward(&p("budget"), Period::Annually, &ends, &budgets, today);
        assert_eq!(outcome.verdict(), Verdict::Fail);
        assert_eq!(outcome.explanation(), "`budget` is not available forward annually");
    }
}
