//! Connectives, conditionals and quantifiers.
//!
//! `NotRelevant` is the neutral element of both connectives: `and` fails if
//! any operand fails, otherwise passes if any passes; `or` passes if any
//! operand passes, otherwise fails if any fails. Two `NotRelevant` operands
//! stay `NotRelevant`.

use crate::types::{Outcome, PathRef, Quantifier, Verdict};

/// `P or Q`.
pub fn either(a: Outcome, b: Outcome) -> Outcome {
    match (a.verdict(), b.verdict()) {
        (Verdict::Pass, _) => a,
        (_, Verdict::Pass) => b,
        (Verdict::Fail, Verdict::Fail) => {
            let errored = a.is_error() || b.is_error();
            Outcome::fail(format!("{}. Additionally, {}", a.explanation(), b.explanation()))
                .tainted(errored)
        }
        (Verdict::Fail, _) => a,
        (_, Verdict::Fail) => b,
        _ => a,
    }
}

/// `P and Q` (also `P but Q`).
///
/// When one side passes and the other is not relevant the result passes and
/// reports why the other side did not apply.
pub fn both(a: Outcome, b: Outcome) -> Outcome {
    match (a.verdict(), b.verdict()) {
        (Verdict::Fail, _) => a,
        (_, Verdict::Fail) => b,
        (Verdict::Pass, Verdict::Pass) => {
            let errored = a.is_error() || b.is_error();
            Outcome::pass(format!("{} and {}", a.explanation(), b.explanation())).tainted(errored)
        }
        (Verdict::Pass, _) => Outcome::pass(b.explanation()).tainted(a.is_error()),
        (_, Verdict::Pass) => Outcome::pass(a.explanation()).tainted(b.is_error()),
        _ => a,
    }
}

/// `if P then Q`. The consequence is only evaluated when the condition
/// passes; any other condition makes the rule not relevant, keeping the
/// condition's explanation. A condition that errored stays flagged as an
/// error.
pub fn if_then(condition: Outcome, consequence: impl FnOnce() -> Outcome) -> Outcome {
    match condition.verdict() {
        Verdict::Pass => consequence(),
        _ => condition.with_verdict(Verdict::NotRelevant),
    }
}

/// `for every activity, Q`.
pub fn for_every_activity(inner: Outcome) -> Outcome {
    let explanation = format!("for every activity, {}", inner.explanation());
    inner.with_explanation(explanation)
}

/// `for every|at least one <path>, Q` over the body outcomes for each
/// selected node, in document order. The iterator is consumed lazily so
/// evaluation stops at the deciding node.
///
/// Quantifiers are two-valued: an empty selection fails, and under `every`
/// a `NotRelevant` body counts as not passing.
pub fn for_each<I>(quantifier: Quantifier, path: &PathRef, outcomes: I) -> Outcome
where
    I: IntoIterator<Item = Outcome>,
{
    let mut last: Option<Outcome> = None;
    let mut errored = false;
    for outcome in outcomes {
        match quantifier {
            Quantifier::Every if !outcome.verdict().is_pass() => {
                return Outcome::fail(format!(
                    "for at least one {path}, the following was not true: {}",
                    outcome.explanation()
                ))
                .tainted(outcome.is_error());
            }
            Quantifier::AtLeastOne if outcome.verdict().is_pass() => {
                return Outcome::pass(format!(
                    "for at least one {path}, {}",
                    outcome.explanation()
                ));
            }
            _ => {}
        }
        errored |= outcome.is_error();
        last = Some(outcome);
    }

    let Some(last) = last else {
        return Outcome::fail(format!("no {path} is present"));
    };
    match quantifier {
        Quantifier::Every => Outcome::pass(format!("for every {path}, {}", last.explanation())),
        Quantifier::AtLeastOne => Outcome::fail(format!(
            "for not one of {path}, {}",
            last.explanation()
        ))
        .tainted(errored),
    }
}
