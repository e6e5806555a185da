use foxpath::{Outcome, Verdict};
use proptest::prelude::*;

// --- Fixed activity schema ---
// title/narrative           : optional free text
// activity-status/@code     : "1".."5", or a non-integer
// sector[@vocabulary]/@code : 0..3 sectors, code from SECTOR_CODES
// transaction/value         : 0..3 transactions
// activity-date[@type='2']  : optional ISO date, or a malformed date

pub const SECTOR_CODES: &[&str] = &["13040", "11110", "99999", "x"];
const STATUSES: &[&str] = &["1", "2", "3", "4", "5", "n/a"];
const VOCABULARIES: &[&str] = &["DAC", "99"];

/// Rule statements that compile against [`codelists`].
pub const RULES: &[&str] = &[
    "`title/narrative` should be present",
    "`title/narrative` should have more than 10 characters",
    "`activity-status/@code` is at least 3",
    "`activity-status/@code` should not be 5",
    "`activity-status/@code` is one of (2, 3, 4)",
    "at least one `sector[@vocabulary=\"DAC\"]/@code` should be on the Sector codelist",
    "every `sector/@code` should be on the Sector codelist",
    "for every `transaction`, `value` should be at least 10",
    "for at least one `transaction`, `value` should be at least 50",
    "`activity-date[@type='2']/@iso-date` should be today, or in the past",
    "`activity-date[@type='2']/@iso-date` should be less than 12 months ago",
    "if `activity-status/@code` is at least 2 then `transaction` should be present",
    "`title/narrative` should be present and `transaction` should be present",
    "`title/narrative` should be present or `transaction` should be present",
];

pub fn codelists() -> foxpath::Codelists {
    foxpath::Codelists::new().with("Sector", ["13040", "11110"])
}

fn arb_date() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (2010_i32..=2017, 1_u32..=12, 1_u32..=28)
            .prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}")),
        1 => Just("2015-13-45".to_owned()),
        1 => Just("soon".to_owned()),
    ]
}

fn arb_sector() -> impl Strategy<Value = String> {
    (
        prop::option::of(prop::sample::select(VOCABULARIES)),
        prop::sample::select(SECTOR_CODES),
    )
        .prop_map(|(vocabulary, code)| match vocabulary {
            Some(v) => format!(r#"<sector vocabulary="{v}" code="{code}"/>"#),
            None => format!(r#"<sector code="{code}"/>"#),
        })
}

/// One `<iati-activity>` element as XML text.
pub fn arb_activity() -> impl Strategy<Value = String> {
    (
        prop::option::of("[A-Za-z ]{0,20}"),
        prop::option::of(prop::sample::select(STATUSES)),
        prop::collection::vec(arb_sector(), 0..3),
        prop::collection::vec(0_u32..100, 0..3),
        prop::option::of(arb_date()),
    )
        .prop_map(|(title, status, sectors, values, date)| {
            let mut xml = String::from("<iati-activity>");
            if let Some(title) = title {
                xml.push_str(&format!("<title><narrative>{title}</narrative></title>"));
            }
            if let Some(status) = status {
                xml.push_str(&format!(r#"<activity-status code="{status}"/>"#));
            }
            for sector in sectors {
                xml.push_str(&sector);
            }
            for value in values {
                xml.push_str(&format!("<transaction><value>{value}</value></transaction>"));
            }
            if let Some(date) = date {
                xml.push_str(&format!(r#"<activity-date type="2" iso-date="{date}"/>"#));
            }
            xml.push_str("</iati-activity>");
            xml
        })
}

/// A document holding 0..8 activities.
pub fn arb_document() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_activity(), 0..8)
        .prop_map(|activities| format!("<iati-activities>{}</iati-activities>", activities.concat()))
}

pub fn arb_rule() -> impl Strategy<Value = &'static str> {
    prop::sample::select(RULES)
}

/// An arbitrary outcome, including contained errors.
pub fn arb_outcome() -> impl Strategy<Value = Outcome> {
    ("[a-z]{1,6}", 0_u8..4).prop_map(|(text, kind)| match kind {
        0 => Outcome::new(Verdict::Pass, text),
        1 => Outcome::new(Verdict::Fail, text),
        2 => Outcome::new(Verdict::NotRelevant, text),
        _ => Outcome::error(text),
    })
}
