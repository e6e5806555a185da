use chrono::NaiveDate;
use foxpath::{compile, Codelists, EvalContext, Verdict, XmlDocument};

fn main() {
    let rule = "for every `transaction`, \
                `transaction-date/@iso-date` should be chronologically before `value/@value-date` \
                or `value` is not 0";
    let expr = compile(rule, &Codelists::new()).expect("failed to compile rule");
    println!("rule: {rule}");
    println!("tree: {expr}");
    println!("nodes: {}", expr.node_count());

    let doc = XmlDocument::parse_str(
        r#"<iati-activities>
            <iati-activity>
                <transaction>
                    <transaction-date iso-date="2015-02-01"/>
                    <value value-date="2015-03-01">250</value>
                </transaction>
            </iati-activity>
            <iati-activity>
                <transaction>
                    <transaction-date iso-date="2015-04-01"/>
                    <value value-date="2015-03-01">0</value>
                </transaction>
            </iati-activity>
            <iati-activity/>
        </iati-activities>"#,
    )
    .expect("failed to parse document");
    let ctx = EvalContext::new(NaiveDate::from_ymd_opt(2015, 12, 1).expect("valid date"));

    for (i, activity) in doc.activities().iter().enumerate() {
        let outcome = foxpath::evaluate(&expr, activity, &ctx);
        let mark = match outcome.verdict() {
            Verdict::Pass => "✓",
            Verdict::Fail => "✗",
            Verdict::NotRelevant => "-",
        };
        println!("activity {i}: {mark} {}", outcome.explanation());
    }
}
