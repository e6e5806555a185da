use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use crate::parse::{grammar, group, normalize, GrammarError, Production};
use crate::types::{
    Codelist, Codelists, CompileError, CompiledRule, Expr, Operand, PathRef, Pattern, Period,
    Phrasing, Quantifier, Rule, RuleSet,
};

/// Result of compiling one fragment: a leaf value or a verdict subtree.
enum Node {
    Value(Operand),
    Verdict(Expr),
}

/// Compiles the fragments of one rule, tagging errors with its id.
struct Compiler<'a> {
    rule: &'a str,
    codelists: &'a Codelists,
}

impl Compiler<'_> {
    fn node(&self, text: &str) -> Result<Node, CompileError> {
        let Some((production, caps)) = grammar().first_match(text) else {
            return Err(CompileError::Grammar {
                rule: self.rule.to_owned(),
                source: GrammarError::new(text),
            });
        };
        debug!(rule = self.rule, ?production, text, "matched grammar entry");
        let g = |i| group(&caps, i);

        let expr = match production {
            // Leaves
            Production::Path => {
                let path = PathRef::new(&text[1..text.len() - 1]);
                if let Some(err) = path.syntax_error() {
                    return Err(CompileError::InvalidPath {
                        rule: self.rule.to_owned(),
                        path: path.query().to_owned(),
                        reason: err.to_string(),
                    });
                }
                return Ok(Node::Value(Operand::Path(path)));
            }
            Production::Integer => return Ok(Node::Value(Operand::Integer(self.integer(text)?))),
            Production::IntegerList => {
                let values = text
                    .split(", ")
                    .map(|item| self.integer(item))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Node::Value(Operand::IntegerList(values)));
            }
            Production::Code => return Ok(Node::Value(Operand::Code(text.to_owned()))),
            Production::Codelist => {
                let name = text.strip_suffix(" codelist").unwrap_or(text);
                return Ok(Node::Value(Operand::Codelist(self.lookup(name)?)));
            }
            Production::Regex => {
                let source = text
                    .strip_prefix("regex `")
                    .and_then(|rest| rest.strip_suffix('`'))
                    .unwrap_or(text);
                return Ok(Node::Value(Operand::Pattern(self.pattern(source)?)));
            }

            // Combinators and quantifiers
            Production::ForEveryActivity => Expr::ForEveryActivity(Box::new(self.verdict(g(1))?)),
            Production::IfThen => Expr::IfThen {
                condition: Box::new(self.verdict(g(1))?),
                consequence: Box::new(self.verdict(g(2))?),
            },
            Production::Either => {
                Expr::Either(Box::new(self.verdict(g(1))?), Box::new(self.verdict(g(2))?))
            }
            Production::Both => {
                Expr::Both(Box::new(self.verdict(g(1))?), Box::new(self.verdict(g(2))?))
            }
            Production::ForEach => Expr::ForEach {
                quantifier: Quantifier::parse(g(1)),
                path: self.path(g(2))?,
                body: Box::new(self.verdict(g(3))?),
            },

            // Operators
            Production::IsOneOf => Expr::IsOneOf {
                path: self.path(g(1))?,
                choices: self.choices(g(2))?,
            },
            Production::IsPast => Expr::IsPast {
                path: self.path(g(1))?,
            },
            Production::NotExists => Expr::NotExists {
                path: self.path(g(1))?,
            },
            Production::Equals => Expr::Equals {
                path: self.path(g(1))?,
                value: self.integer_operand(g(2))?,
            },
            Production::IsNot => Expr::IsNot {
                path: self.path(g(1))?,
                phrasing: Phrasing::parse(g(2)),
                value: self.literal(g(3))?,
            },
            Production::IsBefore => Expr::IsBefore {
                earlier: self.path(g(1))?,
                later: self.path(g(2))?,
            },
            Production::IsAtLeast => Expr::IsAtLeast {
                path: self.path(g(1))?,
                phrasing: Phrasing::parse(g(2)),
                min: self.integer_operand(g(3))?,
            },
            Production::Exists => Expr::Exists {
                path: self.path(g(1))?,
            },
            Production::StartsWith => Expr::StartsWith {
                path: self.path(g(1))?,
                prefix: self.path(g(2))?,
            },
            Production::IsOnList => Expr::IsOnList {
                quantifier: Quantifier::parse(g(1)),
                path: self.path(g(2))?,
                codelist: self.codelist_operand(g(3))?,
            },
            Production::IsOnNamedList => Expr::IsOnList {
                quantifier: Quantifier::AtLeastOne,
                path: self.path(g(1))?,
                codelist: self.lookup(g(2))?,
            },
            Production::MoreThanChars => Expr::MoreThanChars {
                path: self.path(g(1))?,
                min: self.integer_operand(g(2))?,
            },
            Production::LessThanMonthsAgo => Expr::LessThanMonthsAgo {
                path: self.path(g(1))?,
                months: self.integer_operand(g(2))?,
            },
            Production::AvailableForward => Expr::AvailableForward {
                path: self.path(g(1))?,
                period: if g(2) == "quarterly" {
                    Period::Quarterly
                } else {
                    Period::Annually
                },
            },
            Production::MatchesRegex => Expr::MatchesRegex {
                path: self.path(g(1))?,
                pattern: match self.value(g(2), "a regex")? {
                    Operand::Pattern(pattern) => pattern,
                    _ => return Err(self.unexpected(g(2), "a regex")),
                },
            },
        };
        Ok(Node::Verdict(expr))
    }

    fn verdict(&self, text: &str) -> Result<Expr, CompileError> {
        match self.node(text)? {
            Node::Verdict(expr) => Ok(expr),
            Node::Value(_) => Err(self.unexpected(text, "a condition")),
        }
    }

    fn value(&self, text: &str, expected: &'static str) -> Result<Operand, CompileError> {
        match self.node(text)? {
            Node::Value(operand) => Ok(operand),
            Node::Verdict(_) => Err(self.unexpected(text, expected)),
        }
    }

    fn path(&self, text: &str) -> Result<PathRef, CompileError> {
        match self.value(text, "a path")? {
            Operand::Path(path) => Ok(path),
            _ => Err(self.unexpected(text, "a path")),
        }
    }

    fn integer_operand(&self, text: &str) -> Result<i64, CompileError> {
        match self.value(text, "an integer")? {
            Operand::Integer(n) => Ok(n),
            _ => Err(self.unexpected(text, "an integer")),
        }
    }

    fn codelist_operand(&self, text: &str) -> Result<Arc<Codelist>, CompileError> {
        match self.value(text, "a codelist")? {
            Operand::Codelist(list) => Ok(list),
            _ => Err(self.unexpected(text, "a codelist")),
        }
    }

    /// An integer or code literal, as used by `is not`.
    fn literal(&self, text: &str) -> Result<Operand, CompileError> {
        match self.value(text, "an integer or code")? {
            operand @ (Operand::Integer(_) | Operand::Code(_)) => Ok(operand),
            _ => Err(self.unexpected(text, "an integer or code")),
        }
    }

    /// The comma-separated contents of `is one of (...)`.
    fn choices(&self, text: &str) -> Result<Vec<String>, CompileError> {
        text.split(',')
            .map(|item| {
                let operand = self.literal(item.trim())?;
                operand
                    .literal_text()
                    .ok_or_else(|| self.unexpected(item, "an integer or code"))
            })
            .collect()
    }

    fn integer(&self, text: &str) -> Result<i64, CompileError> {
        text.parse().map_err(|_| CompileError::InvalidLiteral {
            rule: self.rule.to_owned(),
            text: text.to_owned(),
        })
    }

    fn lookup(&self, name: &str) -> Result<Arc<Codelist>, CompileError> {
        self.codelists
            .get(name)
            .ok_or_else(|| CompileError::CodelistNotFound {
                rule: self.rule.to_owned(),
                name: name.to_owned(),
            })
    }

    fn pattern(&self, source: &str) -> Result<Pattern, CompileError> {
        Regex::new(source)
            .map(Pattern::new)
            .map_err(|e| CompileError::InvalidPattern {
                rule: self.rule.to_owned(),
                pattern: source.to_owned(),
                reason: e.to_string(),
            })
    }

    fn unexpected(&self, text: &str, expected: &'static str) -> CompileError {
        CompileError::UnexpectedOperand {
            rule: self.rule.to_owned(),
            text: text.to_owned(),
            expected,
        }
    }
}

/// Compile one statement into a verdict tree.
///
/// The normalised text doubles as the rule id in any error.
///
/// # Errors
///
/// Returns [`CompileError`] if the statement, or any fragment of it, matches
/// no grammar entry, has operands of the wrong kind, or names an undeclared
/// codelist.
pub fn compile(text: &str, codelists: &Codelists) -> Result<Expr, CompileError> {
    let source = normalize(text);
    Compiler {
        rule: &source,
        codelists,
    }
    .verdict(&source)
}

/// Compile one rule.
///
/// # Errors
///
/// Returns [`CompileError`] as for [`compile`], naming `rule.id`.
pub fn compile_rule(rule: &Rule, codelists: &Codelists) -> Result<CompiledRule, CompileError> {
    let source = normalize(&rule.expression);
    let expr = Compiler {
        rule: &rule.id,
        codelists,
    }
    .verdict(&source)?;
    debug!(rule = %rule.id, nodes = expr.node_count(), "compiled rule");
    Ok(CompiledRule {
        id: rule.id.clone(),
        source,
        expr,
    })
}

/// Compile every rule, keeping the ones that compile.
///
/// A failure only drops the rule that caused it. Failures are returned in
/// rule order alongside the compiled set; a repeated id is reported as
/// [`CompileError::DuplicateRule`] and the later rule is dropped.
pub fn compile_all(rules: &[Rule], codelists: &Codelists) -> (RuleSet, Vec<CompileError>) {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(rules.len());
    let mut errors = Vec::new();

    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            warn!(rule = %rule.id, "duplicate rule id");
            errors.push(CompileError::DuplicateRule {
                name: rule.id.clone(),
            });
            continue;
        }
        match compile_rule(rule, codelists) {
            Ok(c) => compiled.push(c),
            Err(err) => {
                warn!(rule = %rule.id, error = %err, "rule failed to compile");
                errors.push(err);
            }
        }
    }

    (RuleSet::new(compiled), errors)
}
