use std::fmt;

use winnow::ascii::{dec_uint, multispace0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

/// A parsed path query: one or more location paths joined by `|`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub(crate) branches: Vec<LocationPath>,
}

impl PathExpr {
    /// Parse path text as captured from a rule.
    ///
    /// # Errors
    ///
    /// Returns [`PathSyntaxError`] if the text is not in the supported subset.
    pub fn parse(text: &str) -> Result<Self, PathSyntaxError> {
        union_expr
            .parse(text)
            .map_err(|e| PathSyntaxError::new(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    /// Starts at the document node rather than the context node.
    pub(crate) absolute: bool,
    pub(crate) steps: Vec<LocatedStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocatedStep {
    /// Reached through `//` rather than `/`.
    pub(crate) descendant: bool,
    pub(crate) step: Step,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Element {
        test: NameTest,
        predicates: Vec<Predicate>,
    },
    Attribute(NameTest),
    Text,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NameTest {
    Any,
    Name(String),
}

impl NameTest {
    pub(crate) fn matches(&self, name: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Name(n) => n == name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Neq,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Or(Box<Predicate>, Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Exists(LocationPath),
    Compare {
        path: LocationPath,
        op: CompareOp,
        literal: Literal,
    },
    /// 1-based position among the step's candidates.
    Position(usize),
}

/// Path text that falls outside the supported query subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSyntaxError {
    message: String,
}

impl PathSyntaxError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PathSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path syntax error: {}", self.message)
    }
}

impl std::error::Error for PathSyntaxError {}

// -- Whitespace & names -----------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
        }),
    )
        .take()
        .parse_next(input)
}

fn name_test(input: &mut &str) -> ModalResult<NameTest> {
    alt((
        '*'.value(NameTest::Any),
        name.map(|n: &str| NameTest::Name(n.to_owned())),
    ))
    .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn quoted(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(str::to_owned)
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<f64> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(0.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .try_map(str::parse::<f64>)
        .parse_next(input)
}

fn literal(input: &mut &str) -> ModalResult<Literal> {
    alt((quoted.map(Literal::Text), number.map(Literal::Number)))
        .context(StrContext::Expected(StrContextValue::Description("literal")))
        .parse_next(input)
}

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    alt(("!=".value(CompareOp::Neq), "=".value(CompareOp::Eq))).parse_next(input)
}

// -- Predicates (precedence: or < and < not/primary) -------------------------

fn predicate(input: &mut &str) -> ModalResult<Predicate> {
    delimited(('[', ws), pred_or, (ws, ']')).parse_next(input)
}

fn pred_or(input: &mut &str) -> ModalResult<Predicate> {
    let first = pred_and(input)?;
    let rest: Vec<Predicate> =
        repeat(0.., preceded((ws, "or", ws), pred_and)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, p| Predicate::Or(Box::new(acc), Box::new(p))))
}

fn pred_and(input: &mut &str) -> ModalResult<Predicate> {
    let first = pred_unary(input)?;
    let rest: Vec<Predicate> =
        repeat(0.., preceded((ws, "and", ws), pred_unary)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, p| Predicate::And(Box::new(acc), Box::new(p))))
}

fn pred_unary(input: &mut &str) -> ModalResult<Predicate> {
    alt((
        delimited(("not(", ws), pred_or, (ws, ')')).map(|p| Predicate::Not(Box::new(p))),
        delimited(('(', ws), pred_or, (ws, ')')),
        dec_uint::<_, u32, _>.map(|n| Predicate::Position(n as usize)),
        comparison_or_exists,
    ))
    .parse_next(input)
}

fn comparison_or_exists(input: &mut &str) -> ModalResult<Predicate> {
    let path = location_path(input)?;
    let comparison = opt((ws, compare_op, ws, literal)).parse_next(input)?;
    Ok(match comparison {
        Some((_, op, _, literal)) => Predicate::Compare { path, op, literal },
        None => Predicate::Exists(path),
    })
}

// -- Steps and paths --------------------------------------------------------

fn step(input: &mut &str) -> ModalResult<Step> {
    alt((
        "text()".value(Step::Text),
        preceded('@', name_test).map(Step::Attribute),
        "..".value(Step::Parent),
        '.'.value(Step::SelfNode),
        (name_test, repeat(0.., predicate))
            .map(|(test, predicates)| Step::Element { test, predicates }),
    ))
    .context(StrContext::Expected(StrContextValue::Description("step")))
    .parse_next(input)
}

fn separator(input: &mut &str) -> ModalResult<bool> {
    alt(("//".value(true), "/".value(false))).parse_next(input)
}

fn location_path(input: &mut &str) -> ModalResult<LocationPath> {
    let lead = opt(separator).parse_next(input)?;
    let first = step(input)?;
    let rest: Vec<(bool, Step)> = repeat(0.., (separator, step)).parse_next(input)?;

    let mut steps = vec![LocatedStep {
        descendant: lead == Some(true),
        step: first,
    }];
    steps.extend(
        rest.into_iter()
            .map(|(descendant, step)| LocatedStep { descendant, step }),
    );
    Ok(LocationPath {
        absolute: lead.is_some(),
        steps,
    })
}

fn union_expr(input: &mut &str) -> ModalResult<PathExpr> {
    let branches: Vec<LocationPath> =
        delimited(ws, separated(1.., location_path, (ws, '|', ws)), ws).parse_next(input)?;
    Ok(PathExpr { branches })
}
