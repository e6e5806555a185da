use crate::types::{Codelist, Outcome, Quantifier};

/// Codelist membership under a quantifier.
///
/// `every` requires each value to be on the list and fails on empty input;
/// `at least one` needs a single listed value. Matching is case-insensitive
/// through [`Codelist::contains`].
pub fn is_on_list(quantifier: Quantifier, values: &[String], codelist: &Codelist) -> Outcome {
    if values.is_empty() {
        return Outcome::fail(format!(
            "there are no codes present, so there definitely aren't any from the {codelist}"
        ));
    }
    match quantifier {
        Quantifier::Every => match values.iter().find(|v| !codelist.contains(v)) {
            Some(code) => Outcome::fail(format!(
                "every code used should be from the {codelist}, but at least one ({code}) is not"
            )),
            None => Outcome::pass(format!("every code used is from the {codelist}")),
        },
        Quantifier::AtLeastOne => match values.iter().find(|v| codelist.contains(v)) {
            Some(code) => Outcome::pass(format!(
                "at least one code used is from the {codelist} (e.g. {code})"
            )),
            None => Outcome::fail(format!(
                "none of the codes used are from the {codelist} (the following codes are used: {})",
                values.join(", ")
            )),
        },
    }
}
