use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use super::codelist::{Codelist, Codelists};
use super::context::EvalContext;
use super::error::CompileError;
use super::expr::PathRef;
use super::report::{ActivityResult, BatchReport};
use super::rule::{CompiledRule, Rule};
use super::verdict::Outcome;
use crate::record::Record;

/// Builder for constructing a [`RuleSet`].
///
/// Codelists must be registered before [`compile`](Self::compile) is called;
/// rules resolve codelist references at compile time.
///
/// # Example
///
/// ```
/// use foxpath::RuleSetBuilder;
///
/// let ruleset = RuleSetBuilder::new()
///     .codelist("AidType", ["A01", "B02"])
///     .rule("title", "`title/narrative` should be present")
///     .rule("aid-type", "`default-aid-type/@code` is on list AidType")
///     .compile()
///     .unwrap();
/// assert_eq!(ruleset.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    codelists: Codelists,
    rules: Vec<Rule>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codelist, replacing any earlier list with the same name.
    #[must_use]
    pub fn codelist<I, S>(mut self, name: &str, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codelists.insert(Codelist::new(name, codes));
        self
    }

    /// Use `codelists` as the registry, replacing anything registered so far.
    #[must_use]
    pub fn codelists(mut self, codelists: Codelists) -> Self {
        self.codelists = codelists;
        self
    }

    /// Add a rule statement under `id`.
    #[must_use]
    pub fn rule(mut self, id: &str, expression: &str) -> Self {
        self.rules.push(Rule::new(id, expression));
        self
    }

    /// Add already-loaded rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Compile every rule. The first failure aborts.
    ///
    /// Use [`compile_all`](crate::compile_all) to keep the rules that do
    /// compile.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] encountered, in rule order.
    pub fn compile(self) -> Result<RuleSet, CompileError> {
        let (ruleset, mut errors) = crate::compile::compile_all(&self.rules, &self.codelists);
        if errors.is_empty() {
            Ok(ruleset)
        } else {
            Err(errors.remove(0))
        }
    }
}

struct IdentityPaths {
    identifier: PathRef,
    hierarchy: PathRef,
    narrative_title: PathRef,
    plain_title: PathRef,
}

fn identity_paths() -> &'static IdentityPaths {
    static PATHS: OnceLock<IdentityPaths> = OnceLock::new();
    PATHS.get_or_init(|| IdentityPaths {
        identifier: PathRef::new("iati-identifier/text()"),
        hierarchy: PathRef::new("@hierarchy"),
        narrative_title: PathRef::new("title/narrative/text()"),
        plain_title: PathRef::new("title/text()"),
    })
}

// First value, treating an unreadable path as absent.
fn first_value<R: Record>(record: &R, path: &PathRef) -> Option<String> {
    record
        .query(path)
        .ok()
        .and_then(|values| values.into_iter().next())
}

/// A compiled, immutable set of rules in load order. Thread-safe and
/// designed to live behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) index: HashMap<String, usize>,
}

impl RuleSet {
    pub(crate) fn new(rules: Vec<CompiledRule>) -> Self {
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.id.clone(), i))
            .collect();
        Self { rules, index }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CompiledRule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Rule ids in load order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id.as_str()).collect()
    }

    /// Evaluate one rule against one record. Returns `None` if no rule has
    /// that id.
    #[must_use]
    pub fn evaluate<R: Record>(&self, id: &str, record: &R, ctx: &EvalContext) -> Option<Outcome> {
        self.get(id).map(|rule| rule.evaluate(record, ctx))
    }

    /// Evaluate every rule against one record, in load order.
    #[must_use]
    pub fn evaluate_record<R: Record>(&self, record: &R, ctx: &EvalContext) -> Vec<(&str, Outcome)> {
        self.rules
            .iter()
            .map(|rule| (rule.id.as_str(), rule.evaluate(record, ctx)))
            .collect()
    }

    /// Evaluate every rule against one activity and attach its identifier,
    /// hierarchy and title.
    pub fn evaluate_activity<R: Record>(&self, record: &R, ctx: &EvalContext) -> ActivityResult {
        let paths = identity_paths();
        let identifier =
            first_value(record, &paths.identifier).unwrap_or_else(|| "Unknown".to_owned());
        let hierarchy = first_value(record, &paths.hierarchy).unwrap_or_default();
        let title = first_value(record, &paths.narrative_title)
            .or_else(|| first_value(record, &paths.plain_title));
        let results = self
            .rules
            .iter()
            .map(|rule| (rule.id.clone(), rule.evaluate(record, ctx)))
            .collect();
        ActivityResult::new(identifier, hierarchy, title, results)
    }

    /// Evaluate every rule against every record in parallel and tally the
    /// outcomes. See [`run_batch`](crate::run_batch).
    pub fn run_batch<R: Record + Sync>(&self, records: &[R], ctx: &EvalContext) -> BatchReport {
        crate::batch::run_batch(self, records, ctx)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a CompiledRule;
    type IntoIter = std::slice::Iter<'a, CompiledRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(feature = "binary-cache")]
impl RuleSet {
    /// Serialize this compiled ruleset to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata so callers can tell when the rule source changed.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a compiled ruleset from bytes produced by
    /// [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Serialize this compiled ruleset and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the compiled ruleset it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleSet({} rules)", self.rules.len())
    }
}
