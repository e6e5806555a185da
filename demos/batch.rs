use std::env;

use foxpath::{compile_all, Codelists, EvalContext, FoxpathError, Rule, XmlDocument};

const SAMPLE: &str = r#"<iati-activities>
    <iati-activity>
        <iati-identifier>GB-1-001</iati-identifier>
        <sector vocabulary="DAC" code="13040"/>
        <activity-status code="2"/>
    </iati-activity>
    <iati-activity>
        <iati-identifier>GB-1-002</iati-identifier>
        <sector vocabulary="DAC" code="99999"/>
        <activity-status code="4"/>
        <activity-date type="3" iso-date="2014-05-01"/>
    </iati-activity>
    <iati-activity>
        <iati-identifier>XM-3</iati-identifier>
        <activity-status code="3"/>
    </iati-activity>
</iati-activities>"#;

/// Usage: `cargo run --example batch [activities.xml]`
fn main() -> Result<(), FoxpathError> {
    let doc = match env::args().nth(1) {
        Some(path) => XmlDocument::from_file(path)?,
        None => XmlDocument::parse_str(SAMPLE)?,
    };

    let codelists = Codelists::new().with("Sector", ["13040", "11110", "12220"]);
    let rules = vec![
        Rule::new(
            "sector",
            "at least one `sector[@vocabulary=\"DAC\"]/@code` should be on the Sector codelist",
        ),
        Rule::new("identifier", "`iati-identifier` should start with `reporting-org/@ref`"),
        Rule::new(
            "end-date",
            "if `activity-status/@code` is one of (3, 4) then `activity-date[@type='3']/@iso-date` should be present",
        ),
        Rule::new("typo", "`title` should be presnt"),
    ];

    let (ruleset, errors) = compile_all(&rules, &codelists);
    for err in &errors {
        eprintln!("skipped: {err}");
    }

    let activities = doc.activities();
    let report = ruleset.run_batch(&activities, &EvalContext::today_utc());
    println!("{report}");
    Ok(())
}
