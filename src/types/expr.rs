use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::codelist::Codelist;
use crate::record::{PathExpr, PathSyntaxError, QueryError};

/// A backtick-delimited path expression.
///
/// The text is parsed once, when the rule is compiled, and the parsed query
/// is shared by every evaluation. Equality compares the text.
#[derive(Debug, Clone)]
pub struct PathRef {
    query: String,
    parsed: Result<Arc<PathExpr>, PathSyntaxError>,
}

impl PathRef {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let parsed = PathExpr::parse(&query).map(Arc::new);
        Self { query, parsed }
    }

    /// The path text without the surrounding backticks.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The parsed query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Syntax`] if the text did not parse.
    pub fn expr(&self) -> Result<&PathExpr, QueryError> {
        self.parsed.as_deref().map_err(|source| QueryError::Syntax {
            path: self.query.clone(),
            source: source.clone(),
        })
    }

    pub(crate) fn syntax_error(&self) -> Option<&PathSyntaxError> {
        self.parsed.as_ref().err()
    }
}

impl PartialEq for PathRef {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query
    }
}

impl Eq for PathRef {}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.query)
    }
}

/// A compiled `regex `...`` literal. Equality compares pattern source.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub(crate) fn new(regex: Regex) -> Self {
        Self(regex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "regex `{}`", self.0.as_str())
    }
}

/// Value nodes: leaves of the compiled tree that produce a plain value and
/// never a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(PathRef),
    Integer(i64),
    IntegerList(Vec<i64>),
    Code(String),
    Codelist(Arc<Codelist>),
    Pattern(Pattern),
}

impl Operand {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Operand::Path(_) => "path",
            Operand::Integer(_) => "integer",
            Operand::IntegerList(_) => "integer list",
            Operand::Code(_) => "code",
            Operand::Codelist(_) => "codelist",
            Operand::Pattern(_) => "regex",
        }
    }

    /// Text form used when comparing against record values.
    pub(crate) fn literal_text(&self) -> Option<String> {
        match self {
            Operand::Integer(n) => Some(n.to_string()),
            Operand::Code(code) => Some(code.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Path(p) => write!(f, "{p}"),
            Operand::Integer(n) => write!(f, "{n}"),
            Operand::IntegerList(ns) => {
                let parts: Vec<String> = ns.iter().map(i64::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
            Operand::Code(c) => write!(f, "{c}"),
            Operand::Codelist(list) => write!(f, "{list}"),
            Operand::Pattern(p) => write!(f, "{p}"),
        }
    }
}

/// Whether a rule is phrased as an expectation ("should be") or as a
/// statement ("is"). Only affects explanation wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrasing {
    Should,
    Is,
}

impl Phrasing {
    pub(crate) fn parse(text: &str) -> Self {
        if text.starts_with("should") {
            Phrasing::Should
        } else {
            Phrasing::Is
        }
    }
}

/// `every` or `at least one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Every,
    AtLeastOne,
}

impl Quantifier {
    pub(crate) fn parse(text: &str) -> Self {
        if text == "every" {
            Quantifier::Every
        } else {
            Quantifier::AtLeastOne
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Every => write!(f, "every"),
            Quantifier::AtLeastOne => write!(f, "at least one"),
        }
    }
}

/// Forward-budget period for `is available forward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annually,
    Quarterly,
}

impl Period {
    /// Longest span, in days, a single budget entry may cover.
    #[must_use]
    pub fn max_days(self) -> i64 {
        match self {
            Period::Quarterly => 94,
            Period::Annually => 370,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Annually => write!(f, "annually"),
            Period::Quarterly => write!(f, "quarterly"),
        }
    }
}

/// Verdict nodes: the compiled rule tree. One variant per operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `for every activity, Q`
    ForEveryActivity(Box<Expr>),
    /// `if P then Q`
    IfThen {
        condition: Box<Expr>,
        consequence: Box<Expr>,
    },
    /// `P or Q`
    Either(Box<Expr>, Box<Expr>),
    /// `P and Q`, `P but Q`
    Both(Box<Expr>, Box<Expr>),
    /// `for every|at least one <path>, Q`
    ForEach {
        quantifier: Quantifier,
        path: PathRef,
        body: Box<Expr>,
    },
    IsOneOf {
        path: PathRef,
        choices: Vec<String>,
    },
    IsPast {
        path: PathRef,
    },
    Exists {
        path: PathRef,
    },
    NotExists {
        path: PathRef,
    },
    Equals {
        path: PathRef,
        value: i64,
    },
    IsNot {
        path: PathRef,
        phrasing: Phrasing,
        value: Operand,
    },
    IsBefore {
        earlier: PathRef,
        later: PathRef,
    },
    IsAtLeast {
        path: PathRef,
        phrasing: Phrasing,
        min: i64,
    },
    StartsWith {
        path: PathRef,
        prefix: PathRef,
    },
    IsOnList {
        quantifier: Quantifier,
        path: PathRef,
        codelist: Arc<Codelist>,
    },
    MoreThanChars {
        path: PathRef,
        min: i64,
    },
    LessThanMonthsAgo {
        path: PathRef,
        months: i64,
    },
    AvailableForward {
        path: PathRef,
        period: Period,
    },
    MatchesRegex {
        path: PathRef,
        pattern: Pattern,
    },
}

impl Expr {
    /// Number of verdict nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + match self {
            Expr::ForEveryActivity(inner) => inner.node_count(),
            Expr::IfThen {
                condition,
                consequence,
            } => condition.node_count() + consequence.node_count(),
            Expr::Either(a, b) | Expr::Both(a, b) => a.node_count() + b.node_count(),
            Expr::ForEach { body, .. } => body.node_count(),
            _ => 0,
        }
    }

    /// Names of every codelist the tree references, in first-use order.
    #[must_use]
    pub fn codelists(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_codelists(self, &mut names);
        names
    }
}

fn collect_codelists<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    match expr {
        Expr::IsOnList { codelist, .. } => {
            if !out.contains(&codelist.name()) {
                out.push(codelist.name());
            }
        }
        Expr::ForEveryActivity(inner) | Expr::ForEach { body: inner, .. } => {
            collect_codelists(inner, out);
        }
        Expr::IfThen {
            condition: a,
            consequence: b,
        }
        | Expr::Either(a, b)
        | Expr::Both(a, b) => {
            collect_codelists(a, out);
            collect_codelists(b, out);
        }
        _ => {}
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::ForEveryActivity(inner) => write!(f, "(FOR EVERY ACTIVITY {inner})"),
            Expr::IfThen {
                condition,
                consequence,
            } => write!(f, "(IF {condition} THEN {consequence})"),
            Expr::Either(a, b) => write!(f, "({a} OR {b})"),
            Expr::Both(a, b) => write!(f, "({a} AND {b})"),
            Expr::ForEach {
                quantifier,
                path,
                body,
            } => write!(f, "(FOR {quantifier} {path} {body})"),
            Expr::IsOneOf { path, choices } => write!(f, "{path} in ({})", choices.join(", ")),
            Expr::IsPast { path } => write!(f, "past({path})"),
            Expr::Exists { path } => write!(f, "exists({path})"),
            Expr::NotExists { path } => write!(f, "not_exists({path})"),
            Expr::Equals { path, value } => write!(f, "{path} == {value}"),
            Expr::IsNot { path, value, .. } => write!(f, "{path} != {value}"),
            Expr::IsBefore { earlier, later } => write!(f, "{earlier} <= {later}"),
            Expr::IsAtLeast { path, min, .. } => write!(f, "{path} >= {min}"),
            Expr::StartsWith { path, prefix } => write!(f, "starts_with({path}, {prefix})"),
            Expr::IsOnList {
                quantifier,
                path,
                codelist,
            } => write!(f, "{quantifier} {path} in {codelist}"),
            Expr::MoreThanChars { path, min } => write!(f, "len({path}) > {min}"),
            Expr::LessThanMonthsAgo { path, months } => {
                write!(f, "months_ago({path}) < {months}")
            }
            Expr::AvailableForward { path, period } => {
                write!(f, "available_forward({path}, {period})")
            }
            Expr::MatchesRegex { path, pattern } => write!(f, "{path} ~ {pattern}"),
        }
    }
}
