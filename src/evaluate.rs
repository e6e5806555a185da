use std::sync::OnceLock;

use tracing::debug;

use crate::record::{QueryError, Record};
use crate::semantics::dates::{BudgetPeriod, ACTIVITY_END_DATES, PERIOD_END, PERIOD_START};
use crate::semantics::{codelist, compare, dates, logic, presence};
use crate::types::{EvalContext, EvalError, Expr, Outcome, PathRef};

/// Evaluate a compiled tree against one record.
///
/// Never fails: an [`EvalError`] raised by an operator becomes an errored
/// `Fail` at that node, and the enclosing combinators carry on.
pub fn evaluate<R: Record>(expr: &Expr, record: &R, ctx: &EvalContext) -> Outcome {
    match eval_node(expr, record, ctx) {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!(node = %expr, error = %err, "contained evaluation error");
            Outcome::error(err.to_string())
        }
    }
}

/// The fixed paths read by `available forward`, parsed once.
struct BudgetPaths {
    end_dates: PathRef,
    start: PathRef,
    end: PathRef,
}

fn budget_paths() -> &'static BudgetPaths {
    static PATHS: OnceLock<BudgetPaths> = OnceLock::new();
    PATHS.get_or_init(|| BudgetPaths {
        end_dates: PathRef::new(ACTIVITY_END_DATES),
        start: PathRef::new(PERIOD_START),
        end: PathRef::new(PERIOD_END),
    })
}

fn eval_node<R: Record>(expr: &Expr, record: &R, ctx: &EvalContext) -> Result<Outcome, EvalError> {
    let outcome = match expr {
        Expr::ForEveryActivity(inner) => logic::for_every_activity(evaluate(inner, record, ctx)),
        Expr::IfThen {
            condition,
            consequence,
        } => logic::if_then(evaluate(condition, record, ctx), || {
            evaluate(consequence, record, ctx)
        }),
        Expr::Either(a, b) => logic::either(evaluate(a, record, ctx), evaluate(b, record, ctx)),
        Expr::Both(a, b) => logic::both(evaluate(a, record, ctx), evaluate(b, record, ctx)),
        Expr::ForEach {
            quantifier,
            path,
            body,
        } => {
            let nodes = record.select(path)?;
            logic::for_each(
                *quantifier,
                path,
                nodes.iter().map(|node| evaluate(body, node, ctx)),
            )
        }

        Expr::Exists { path } => presence::exists(path, record.present(path)?),
        Expr::NotExists { path } => presence::not_exists(path, record.present(path)?),

        Expr::Equals { path, value } => compare::equals(path, &record.query(path)?, *value),
        Expr::IsNot {
            path,
            phrasing,
            value,
        } => compare::is_not(path, &record.query(path)?, *phrasing, &value.to_string()),
        Expr::IsOneOf { path, choices } => compare::is_one_of(path, &record.query(path)?, choices),
        Expr::IsAtLeast {
            path,
            phrasing,
            min,
        } => compare::is_at_least(path, &record.query(path)?, *phrasing, *min)?,
        Expr::MoreThanChars { path, min } => {
            compare::more_than_chars(path, &record.query(path)?, *min)
        }
        Expr::StartsWith { path, prefix } => {
            compare::starts_with(path, &record.query(path)?, prefix, &record.query(prefix)?)
        }
        Expr::MatchesRegex { path, pattern } => {
            compare::matches_regex(path, &record.query(path)?, pattern)
        }

        Expr::IsOnList {
            quantifier,
            path,
            codelist,
        } => codelist::is_on_list(*quantifier, &record.query(path)?, codelist),

        Expr::IsPast { path } => dates::is_past(path, &record.query(path)?, ctx.today()),
        Expr::IsBefore { earlier, later } => dates::is_before(
            earlier,
            &record.query(earlier)?,
            later,
            &record.query(later)?,
        ),
        Expr::LessThanMonthsAgo { path, months } => {
            dates::less_than_months_ago(path, &record.query(path)?, *months, ctx.today())
        }
        Expr::AvailableForward { path, period } => {
            let paths = budget_paths();
            let end_dates = record.query(&paths.end_dates)?;
            let budgets = record
                .select(path)?
                .iter()
                .map(|budget| -> Result<BudgetPeriod, QueryError> {
                    Ok(BudgetPeriod::new(
                        budget.query(&paths.start)?,
                        budget.query(&paths.end)?,
                    ))
                })
                .collect::<Result<Vec<_>, QueryError>>()?;
            dates::available_forward(path, *period, &end_dates, &budgets, ctx.today())
        }
    };
    Ok(outcome)
}
