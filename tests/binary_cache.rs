#![cfg(feature = "binary-cache")]

use chrono::NaiveDate;
use foxpath::serial::DeserializeError;
use foxpath::{EvalContext, Outcome, RuleSet, RuleSetBuilder, XmlDocument};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SOURCE: &str = "\
sector: at least one `sector[@vocabulary=\"DAC\"]/@code` should be on the Sector codelist
title: `title/narrative` should have more than 5 characters
identifier: `iati-identifier` should match the regex `^GB-[0-9]+-`
";

fn ruleset() -> RuleSet {
    RuleSetBuilder::new()
        .codelist("Sector", ["13040", "11110"])
        .codelist("AidType", ["A01", "B02"])
        .rule(
            "sector",
            "at least one `sector[@vocabulary=\"DAC\"]/@code` should be on the Sector codelist",
        )
        .rule("title", "`title/narrative` should have more than 5 characters")
        .rule("identifier", "`iati-identifier` should match the regex `^GB-[0-9]+-`")
        .rule("aid-type", "`default-aid-type/@code` is on list AidType")
        .rule(
            "status",
            "if `activity-status/@code` is one of (2, 3) then `budget` should be available forward quarterly",
        )
        .rule(
            "transactions",
            "for every `transaction`, `transaction-date/@iso-date` should be chronologically before `value/@value-date` or `value` is not 0",
        )
        .rule("excluded", "`activity-status/@code` should not be X1")
        .compile()
        .unwrap()
}

const ACTIVITY: &str = r#"<iati-activity>
    <iati-identifier>GB-1-001</iati-identifier>
    <title><narrative>Rural water supply</narrative></title>
    <activity-status code="2"/>
    <activity-date type="3" iso-date="2016-01-31"/>
    <default-aid-type code="b02"/>
    <sector vocabulary="DAC" code="13040"/>
    <transaction>
        <transaction-date iso-date="2015-02-01"/>
        <value value-date="2015-01-01">0</value>
    </transaction>
</iati-activity>"#;

fn outcomes(rules: &RuleSet) -> Vec<(String, Outcome)> {
    let doc = XmlDocument::parse_str(ACTIVITY).unwrap();
    let ctx = EvalContext::new(NaiveDate::from_ymd_opt(2015, 12, 1).unwrap());
    rules
        .evaluate_record(&doc.activities()[0], &ctx)
        .into_iter()
        .map(|(id, outcome)| (id.to_owned(), outcome))
        .collect()
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_rules() {
    let original = ruleset();
    let bytes = original.to_bytes(None).unwrap();
    let restored = RuleSet::from_bytes(&bytes).unwrap();

    assert_eq!(restored.ids(), original.ids());
    for rule in &original {
        assert_eq!(restored.get(rule.id()), Some(rule));
    }
}

#[test]
fn round_trip_preserves_outcomes() {
    let original = ruleset();
    let restored = RuleSet::from_bytes(&original.to_bytes(Some(SOURCE)).unwrap()).unwrap();
    assert_eq!(outcomes(&original), outcomes(&restored));
}

#[test]
fn source_digest_changes_bytes() {
    let rules = ruleset();
    let plain = rules.to_bytes(None).unwrap();
    let with_source = rules.to_bytes(Some(SOURCE)).unwrap();
    assert_ne!(plain, with_source);
    assert_eq!(&plain[0..4], b"FOXP");
}

#[test]
fn empty_ruleset_round_trip() {
    let empty = RuleSetBuilder::new().compile().unwrap();
    let restored = RuleSet::from_bytes(&empty.to_bytes(None).unwrap()).unwrap();
    assert!(restored.is_empty());
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn corruption_byte_flip() {
    let mut corrupted = ruleset().to_bytes(None).unwrap();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;

    let err = RuleSet::from_bytes(&corrupted).unwrap_err();
    assert!(
        matches!(err, DeserializeError::ChecksumMismatch),
        "expected ChecksumMismatch, got: {err}"
    );
}

#[test]
fn corruption_truncation() {
    let bytes = ruleset().to_bytes(None).unwrap();
    let err = RuleSet::from_bytes(&bytes[..33]).unwrap_err();
    assert!(
        matches!(err, DeserializeError::LengthMismatch { .. }),
        "expected LengthMismatch, got: {err}"
    );
}

#[test]
fn bad_magic() {
    let mut bad = ruleset().to_bytes(None).unwrap();
    bad[0..4].copy_from_slice(b"OORO");

    let err = RuleSet::from_bytes(&bad).unwrap_err();
    assert!(
        matches!(err, DeserializeError::BadMagic),
        "expected BadMagic, got: {err}"
    );
}

#[test]
fn version_mismatch() {
    let mut bad = ruleset().to_bytes(None).unwrap();
    bad[4] = 99;
    bad[5] = 0;

    let err = RuleSet::from_bytes(&bad).unwrap_err();
    assert!(
        matches!(
            err,
            DeserializeError::IncompatibleVersion {
                blob: 99,
                supported: 1
            }
        ),
        "expected IncompatibleVersion, got: {err}"
    );
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn file_round_trip() {
    let dir = std::env::temp_dir().join("foxpath_test_binary_cache");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("rules.foxp");

    let original = ruleset();
    original.to_binary_file(&path, Some(SOURCE)).unwrap();
    let restored = RuleSet::from_binary_file(&path).unwrap();
    assert_eq!(outcomes(&original), outcomes(&restored));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("foxpath_test_binary_cache_missing.foxp");
    let err = RuleSet::from_binary_file(path).unwrap_err();
    assert!(matches!(err, DeserializeError::Io(_)));
}
