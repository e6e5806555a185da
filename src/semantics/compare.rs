use crate::types::{EvalError, Outcome, PathRef, Pattern, Phrasing};

/// Pass iff any value equals `value` exactly.
pub fn equals(path: &PathRef, values: &[String], value: i64) -> Outcome {
    let expected = value.to_string();
    if values.iter().any(|v| *v == expected) {
        Outcome::pass(format!("{path} is equal to {value}"))
    } else {
        Outcome::fail(format!("{path} is not equal to {value}"))
    }
}

/// Pass unless some value equals `literal`. Empty input passes.
pub fn is_not(path: &PathRef, values: &[String], phrasing: Phrasing, literal: &str) -> Outcome {
    if !values.iter().any(|v| v == literal) {
        let verb = match phrasing {
            Phrasing::Should => "should not be",
            Phrasing::Is => "is not",
        };
        return Outcome::pass(format!("{path} {verb} equal to {literal}"));
    }
    match phrasing {
        Phrasing::Is => Outcome::fail(format!("the activity has {path} equal to {literal}")),
        Phrasing::Should => Outcome::fail(format!(
            "the activity shouldn't have {path} equal to {literal}, but does"
        )),
    }
}

/// Pass iff any value is one of `choices`. Empty input passes.
pub fn is_one_of(path: &PathRef, values: &[String], choices: &[String]) -> Outcome {
    let listed = choices.join(", ");
    let Some(last) = values.last() else {
        return Outcome::pass(format!(
            "{path} should be one of {listed}. However, the activity doesn't contain that element"
        ));
    };
    match values.iter().find(|v| choices.contains(*v)) {
        Some(found) => Outcome::pass(format!("{path} is one of {listed} (it's {found})")),
        None => Outcome::fail(format!("{path} is not one of {listed} (it's {last})")),
    }
}

/// Pass iff any value, read as an integer, is at least `min`. Empty input
/// passes: a missing element cannot contradict the rule.
///
/// # Errors
///
/// Returns [`EvalError::NotAnInteger`] when a value inspected before the
/// first satisfying one is not an integer.
pub fn is_at_least(
    path: &PathRef,
    values: &[String],
    phrasing: Phrasing,
    min: i64,
) -> Result<Outcome, EvalError> {
    if values.is_empty() {
        return Ok(Outcome::pass(format!(
            "{path} should be at least {min}. However, the activity doesn't contain that element"
        )));
    }
    let mut last = "";
    for value in values {
        let n = parse_integer(path, value)?;
        last = value.as_str();
        if n >= min {
            return Ok(Outcome::pass(format!(
                "{path} is at least {min} (it's {value})"
            )));
        }
    }
    Ok(match phrasing {
        Phrasing::Is => Outcome::fail(format!("{path} is less than {min}")),
        Phrasing::Should => Outcome::fail(format!(
            "{path} should be at least {min}, but is only {last}"
        )),
    })
}

fn parse_integer(path: &PathRef, value: &str) -> Result<i64, EvalError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| EvalError::NotAnInteger {
            path: path.to_string(),
            value: value.to_owned(),
        })
}

/// Pass iff the longest value has more than `min` characters.
pub fn more_than_chars(path: &PathRef, values: &[String], min: i64) -> Outcome {
    let longest = values
        .iter()
        .map(|v| (v.chars().count(), v))
        .max();
    let Some((length, text)) = longest else {
        return Outcome::fail(format!("{path} is not present"));
    };
    let exceeds = i64::try_from(length).map_or(true, |n| n > min);
    if exceeds {
        Outcome::pass(format!(
            "'{text}' is more than {min} characters long (it's {length})"
        ))
    } else {
        Outcome::fail(format!(
            "'{text}' is too short (it's only {length} characters long)"
        ))
    }
}

/// Pass iff the first value of `path` starts with the first value of
/// `prefix`. Either side missing fails.
pub fn starts_with(
    path: &PathRef,
    values: &[String],
    prefix: &PathRef,
    prefixes: &[String],
) -> Outcome {
    match (values.first(), prefixes.first()) {
        (None, None) => Outcome::fail(format!(
            "{path} should start with {prefix}, but neither are present on the activity"
        )),
        (None, Some(y)) => Outcome::fail(format!(
            "{path} should start with {prefix} ('{y}'), but {path} isn't present on the activity"
        )),
        (Some(x), None) => Outcome::fail(format!(
            "{path} ('{x}') should start with {prefix}, but {prefix} isn't present on the activity"
        )),
        (Some(x), Some(y)) if x.starts_with(y.as_str()) => Outcome::pass(format!(
            "{path} ('{x}') correctly starts with {prefix} ('{y}')"
        )),
        (Some(x), Some(y)) => Outcome::fail(format!(
            "{path} ('{x}') should start with {prefix} ('{y}'), but doesn't"
        )),
    }
}

/// Pass iff every value contains a match for `pattern`. Empty input passes.
pub fn matches_regex(path: &PathRef, values: &[String], pattern: &Pattern) -> Outcome {
    match values.iter().find(|v| !pattern.is_match(v)) {
        None => Outcome::pass(format!("All {path} match the {pattern}")),
        Some(bad) => Outcome::fail(format!("The {path} {bad} does not match the {pattern}")),
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;
    use crate::Verdict;

    fn vals(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn p(q: &str) -> PathRef {
        PathRef::new(q)
    }

    #[test]
    fn equals_compares_integer_text() {
        let path = p("activity-status/@code");
        assert_eq!(equals(&path, &vals(&["1", "2"]), 2).verdict(), Verdict::Pass);
        let outcome = equals(&path, &vals(&["02"]), 2);
        assert_eq!(outcome.verdict(), Verdict::Fail);
        assert_eq!(outcome.explanation(), "`activity-status/@code` is not equal to 2");
        assert_eq!(equals(&path, &[], 2).verdict(), Verdict::Fail);
    }

    #[test]
    fn is_not_defaults_to_pass() {
        let path = p("activity-status/@code");
        let outcome = is_not(&path, &[], Phrasing::Should, "3");
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(
            outcome.explanation(),
            "`activity-status/@code` should not be equal to 3"
        );
    }

    #[test]
    fn is_not_fail_wording_follows_phrasing() {
        let path = p("x");
        let values = vals(&["A01"]);
        assert_eq!(
            is_not(&path, &values, Phrasing::Is, "A01").explanation(),
            "the activity has `x` equal to A01"
        );
        assert_eq!(
            is_not(&path, &values, Phrasing::Should, "A01").explanation(),
            "the activity shouldn't have `x` equal to A01, but does"
        );
    }

    #[test]
    fn is_one_of_cases() {
        let path = p("activity-status/@code");
        let choices = vals(&["2", "3"]);
        let empty = is_one_of(&path, &[], &choices);
        assert_eq!(empty.verdict(), Verdict::Pass);
        assert!(empty.explanation().ends_with("doesn't contain that element"));

        let hit = is_one_of(&path, &vals(&["1", "3"]), &choices);
        assert_eq!(hit.verdict(), Verdict::Pass);
        assert_eq!(hit.explanation(), "`activity-status/@code` is one of 2, 3 (it's 3)");

        let miss = is_one_of(&path, &vals(&["4"]), &choices);
        assert_eq!(miss.verdict(), Verdict::Fail);
        assert_eq!(miss.explanation(), "`activity-status/@code` is not one of 2, 3 (it's 4)");
    }

    #[test]
    fn is_at_least_vacuous_pass() {
        let outcome = is_at_least(&p("collaboration-type/@code"), &[], Phrasing::Should, 1).unwrap();
        assert_eq!(outcome.verdict(), Verdict::Pass);
    }

    #[test]
    fn is_at_least_short_circuits() {
        let path = p("x");
        let outcome = is_at_least(&path, &vals(&["1", "5", "junk"]), Phrasing::Is, 2).unwrap();
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(outcome.explanation(), "`x` is at least 2 (it's 5)");
    }

    #[test]
    fn is_at_least_failure_wording() {
        let path = p("x");
        let values = vals(&["0", " 1 "]);
        assert_eq!(
            is_at_least(&path, &values, Phrasing::Is, 2).unwrap().explanation(),
            "`x` is less than 2"
        );
        assert_eq!(
            is_at_least(&path, &values, Phrasing::Should, 2).unwrap().explanation(),
            "`x` should be at least 2, but is only  1 "
        );
    }

    #[test]
    fn is_at_least_rejects_non_integers() {
        let err = is_at_least(&p("x"), &vals(&["two"]), Phrasing::Is, 2).unwrap_err();
        assert!(matches!(err, EvalError::NotAnInteger { ref value, .. } if value == "two"));
    }

    #[test]
    fn more_than_chars_uses_longest() {
        let path = p("description");
        let outcome = more_than_chars(&path, &vals(&["short", "a much longer one"]), 10);
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(
            outcome.explanation(),
            "'a much longer one' is more than 10 characters long (it's 17)"
        );
        let outcome = more_than_chars(&path, &vals(&["abc"]), 3);
        assert_eq!(outcome.verdict(), Verdict::Fail);
        assert_eq!(outcome.explanation(), "'abc' is too short (it's only 3 characters long)");
        assert_eq!(more_than_chars(&path, &[], 0).verdict(), Verdict::Fail);
    }

    #[test]
    fn more_than_chars_counts_characters() {
        let outcome = more_than_chars(&p("t"), &vals(&["ééé"]), 3);
        assert_eq!(outcome.verdict(), Verdict::Fail);
    }

    #[test]
    fn starts_with_cases() {
        let id = p("iati-identifier");
        let org = p("reporting-org/@ref");
        let outcome = starts_with(&id, &vals(&["GB-1-123"]), &org, &vals(&["GB-1"]));
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(
            outcome.explanation(),
            "`iati-identifier` ('GB-1-123') correctly starts with `reporting-org/@ref` ('GB-1')"
        );
        assert_eq!(
            starts_with(&id, &vals(&["XM-1"]), &org, &vals(&["GB-1"])).verdict(),
            Verdict::Fail
        );
        assert_eq!(starts_with(&id, &[], &org, &[]).verdict(), Verdict::Fail);
        assert_eq!(
            starts_with(&id, &vals(&["GB-1"]), &org, &[]).explanation(),
            "`iati-identifier` ('GB-1') should start with `reporting-org/@ref`, but `reporting-org/@ref` isn't present on the activity"
        );
    }

    #[test]
    fn matches_regex_requires_every_value() {
        let pattern = Pattern::new(Regex::new("[0-9]{4}").unwrap());
        let path = p("@iso-date");
        assert_eq!(
            matches_regex(&path, &vals(&["2014-01-01", "x2015"]), &pattern).verdict(),
            Verdict::Pass
        );
        let outcome = matches_regex(&path, &vals(&["2014", "n/a"]), &pattern);
        assert_eq!(outcome.verdict(), Verdict::Fail);
        assert_eq!(
            outcome.explanation(),
            "The `@iso-date` n/a does not match the regex `[0-9]{4}`"
        );
        assert_eq!(matches_regex(&path, &[], &pattern).verdict(), Verdict::Pass);
    }
}
