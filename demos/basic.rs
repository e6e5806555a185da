use chrono::NaiveDate;
use foxpath::{EvalContext, RuleSetBuilder, XmlDocument};

fn main() {
    // Define rules
    let ruleset = RuleSetBuilder::new()
        .codelist("AidType", ["A01", "A02", "B01", "C01"])
        .rule("title", "`title/narrative` should be present")
        .rule("aid-type", "`default-aid-type/@code` is on list AidType")
        .rule(
            "capital-spend",
            "if `activity-status/@code` is at least 2 then `capital-spend` should be present",
        )
        .compile()
        .expect("failed to compile ruleset");

    println!("{ruleset}");
    for rule in &ruleset {
        println!("  {rule}");
    }

    // Evaluate against one activity
    let doc = XmlDocument::parse_str(
        r#"<iati-activity>
            <title><narrative>Rural water supply</narrative></title>
            <default-aid-type code="c01"/>
            <activity-status code="1"/>
        </iati-activity>"#,
    )
    .expect("failed to parse activity");
    let ctx = EvalContext::new(NaiveDate::from_ymd_opt(2015, 12, 1).expect("valid date"));

    println!("{}", ruleset.evaluate_activity(&doc.activities()[0], &ctx));
}
