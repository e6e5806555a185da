use foxpath::{compile, compile_all, Codelists, CompileError, Expr, Quantifier, Rule};

fn codelists() -> Codelists {
    Codelists::new()
        .with("Sector", ["13040"])
        .with("AidType", ["A01", "B02"])
}

fn tree(text: &str) -> String {
    compile(text, &codelists()).unwrap().to_string()
}

#[test]
fn conditional_binds_before_connectives() {
    assert_eq!(
        tree("if `a` is present then `b` is present or `c` is present"),
        "(IF exists(`a`) THEN (exists(`b`) OR exists(`c`)))"
    );
}

#[test]
fn or_binds_looser_than_and() {
    assert_eq!(
        tree("`a` is present and `b` is present or `c` is present"),
        "((exists(`a`) AND exists(`b`)) OR exists(`c`))"
    );
}

#[test]
fn alternatively_is_a_synonym_for_or() {
    assert_eq!(
        tree("`a` should be present. Alternatively, `b` should be present"),
        "(exists(`a`) OR exists(`b`))"
    );
}

#[test]
fn but_is_a_synonym_for_and() {
    assert_eq!(
        tree("`a` is present but `b` is not present"),
        "(exists(`a`) AND not_exists(`b`))"
    );
}

#[test]
fn quantifier_body_takes_the_rest_of_the_rule() {
    assert_eq!(
        tree("for at least one `transaction`, `value` is at least 1 and `value` is 2"),
        "(FOR at least one `transaction` (`value` >= 1 AND `value` == 2))"
    );
}

#[test]
fn every_activity_wraps_the_statement() {
    assert_eq!(
        tree("for every activity, `title` should be present"),
        "(FOR EVERY ACTIVITY exists(`title`))"
    );
}

#[test]
fn past_dates_are_not_split_on_or() {
    assert_eq!(
        tree("`activity-date/@iso-date` should be today, or in the past"),
        "past(`activity-date/@iso-date`)"
    );
}

#[test]
fn not_present_wins_over_is_not() {
    assert!(matches!(
        compile("`capital-spend` is not present", &codelists()).unwrap(),
        Expr::NotExists { .. }
    ));
}

#[test]
fn multiline_bulleted_rule() {
    let text = "
        * every `sector/@code`
          should be on the Sector codelist
    ";
    match compile(text, &codelists()).unwrap() {
        Expr::IsOnList {
            quantifier, path, ..
        } => {
            assert_eq!(quantifier, Quantifier::Every);
            assert_eq!(path.query(), "sector/@code");
        }
        other => panic!("expected IsOnList, got {other}"),
    }
}

#[test]
fn paths_are_kept_verbatim() {
    let expr = compile(
        "`transaction[transaction-type/@code=\"D\"]/value/@value-date` should be present",
        &codelists(),
    )
    .unwrap();
    assert_eq!(
        expr,
        Expr::Exists {
            path: foxpath::PathRef::new("transaction[transaction-type/@code=\"D\"]/value/@value-date")
        }
    );
}

#[test]
fn errors_name_the_rule() {
    let rules = [
        Rule::new("bad-grammar", "`title` should sparkle"),
        Rule::new("bad-list", "every `sector/@code` should be on the Nope codelist"),
        Rule::new("bad-regex", "`title` should match the regex `[`"),
        Rule::new("bad-path", "`sector[@code` should be present"),
        Rule::new("good", "`title` should be present"),
    ];
    let (ruleset, errors) = compile_all(&rules, &codelists());
    assert_eq!(ruleset.ids(), vec!["good"]);

    let named: Vec<&str> = errors.iter().map(CompileError::rule).collect();
    assert_eq!(named, vec!["bad-grammar", "bad-list", "bad-regex", "bad-path"]);
    assert_eq!(
        errors[0].to_string(),
        "cannot compile rule 'bad-grammar': I don't understand `title` should sparkle"
    );
    assert_eq!(
        errors[1].to_string(),
        "rule 'bad-list' references undeclared codelist 'Nope'"
    );
    assert!(matches!(
        &errors[3],
        CompileError::InvalidPath { path, .. } if path == "sector[@code"
    ));
}

#[test]
fn empty_rule_is_a_grammar_error() {
    assert!(matches!(
        compile("   ", &codelists()),
        Err(CompileError::Grammar { .. })
    ));
}
