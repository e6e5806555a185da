//! Binary serialization and deserialization of compiled rulesets.
//!
//! A compiled [`RuleSet`](crate::RuleSet) is written as a 32-byte fixed header
//! followed by a bincode-encoded payload. Codelists are stored once in a table
//! and referenced by index from the rule trees; regex patterns are stored as
//! source and recompiled on load.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"FOXP"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The format version in the header must match exactly, otherwise decoding
//! fails with [`DeserializeError::IncompatibleVersion`]. The engine version is
//! informational only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    Codelist, CompiledRule, Expr, Operand, PathRef, Pattern, Period, Phrasing, Quantifier,
    RuleSet,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"FOXP";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`RuleSet`](crate::RuleSet) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode ruleset: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`RuleSet`](crate::RuleSet) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a foxpath binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRuleSet {
    metadata: RuleSetMetadata,
    codelists: Vec<SerializedCodelist>,
    rules: Vec<SerializedRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleSetMetadata {
    rule_count: usize,
    codelist_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedCodelist {
    name: String,
    codes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    id: String,
    source: String,
    expr: SerializedExpr,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedQuantifier {
    Every,
    AtLeastOne,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedPhrasing {
    Should,
    Is,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedPeriod {
    Annually,
    Quarterly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedOperand {
    Path(String),
    Integer(i64),
    IntegerList(Vec<i64>),
    Code(String),
    Codelist(usize),
    Pattern(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedExpr {
    ForEveryActivity(Box<SerializedExpr>),
    IfThen(Box<SerializedExpr>, Box<SerializedExpr>),
    Either(Box<SerializedExpr>, Box<SerializedExpr>),
    Both(Box<SerializedExpr>, Box<SerializedExpr>),
    ForEach {
        quantifier: SerializedQuantifier,
        path: String,
        body: Box<SerializedExpr>,
    },
    IsOneOf {
        path: String,
        choices: Vec<String>,
    },
    IsPast(String),
    Exists(String),
    NotExists(String),
    Equals {
        path: String,
        value: i64,
    },
    IsNot {
        path: String,
        phrasing: SerializedPhrasing,
        value: SerializedOperand,
    },
    IsBefore {
        earlier: String,
        later: String,
    },
    IsAtLeast {
        path: String,
        phrasing: SerializedPhrasing,
        min: i64,
    },
    StartsWith {
        path: String,
        prefix: String,
    },
    IsOnList {
        quantifier: SerializedQuantifier,
        path: String,
        codelist: usize,
    },
    MoreThanChars {
        path: String,
        min: i64,
    },
    LessThanMonthsAgo {
        path: String,
        months: i64,
    },
    AvailableForward {
        path: String,
        period: SerializedPeriod,
    },
    MatchesRegex {
        path: String,
        pattern: String,
    },
}

// ---------------------------------------------------------------------------
// Small enum conversions
// ---------------------------------------------------------------------------

fn serialize_quantifier(q: Quantifier) -> SerializedQuantifier {
    match q {
        Quantifier::Every => SerializedQuantifier::Every,
        Quantifier::AtLeastOne => SerializedQuantifier::AtLeastOne,
    }
}

fn deserialize_quantifier(q: SerializedQuantifier) -> Quantifier {
    match q {
        SerializedQuantifier::Every => Quantifier::Every,
        SerializedQuantifier::AtLeastOne => Quantifier::AtLeastOne,
    }
}

fn serialize_phrasing(p: Phrasing) -> SerializedPhrasing {
    match p {
        Phrasing::Should => SerializedPhrasing::Should,
        Phrasing::Is => SerializedPhrasing::Is,
    }
}

fn deserialize_phrasing(p: SerializedPhrasing) -> Phrasing {
    match p {
        SerializedPhrasing::Should => Phrasing::Should,
        SerializedPhrasing::Is => Phrasing::Is,
    }
}

fn serialize_period(p: Period) -> SerializedPeriod {
    match p {
        Period::Annually => SerializedPeriod::Annually,
        Period::Quarterly => SerializedPeriod::Quarterly,
    }
}

fn deserialize_period(p: SerializedPeriod) -> Period {
    match p {
        SerializedPeriod::Annually => Period::Annually,
        SerializedPeriod::Quarterly => Period::Quarterly,
    }
}

// ---------------------------------------------------------------------------
// RuleSet -> serialized
// ---------------------------------------------------------------------------

/// Interns codelists by name so each one is written once.
#[derive(Default)]
struct CodelistTable {
    lists: Vec<SerializedCodelist>,
    slots: HashMap<String, usize>,
}

impl CodelistTable {
    fn slot(&mut self, list: &Codelist) -> usize {
        if let Some(&slot) = self.slots.get(list.name()) {
            return slot;
        }
        let slot = self.lists.len();
        self.lists.push(SerializedCodelist {
            name: list.name().to_owned(),
            codes: list.codes().map(str::to_owned).collect(),
        });
        self.slots.insert(list.name().to_owned(), slot);
        slot
    }
}

fn serialize_operand(operand: &Operand, table: &mut CodelistTable) -> SerializedOperand {
    match operand {
        Operand::Path(p) => SerializedOperand::Path(p.query().to_owned()),
        Operand::Integer(n) => SerializedOperand::Integer(*n),
        Operand::IntegerList(ns) => SerializedOperand::IntegerList(ns.clone()),
        Operand::Code(c) => SerializedOperand::Code(c.clone()),
        Operand::Codelist(list) => SerializedOperand::Codelist(table.slot(list)),
        Operand::Pattern(p) => SerializedOperand::Pattern(p.as_str().to_owned()),
    }
}

fn serialize_expr(expr: &Expr, table: &mut CodelistTable) -> SerializedExpr {
    let boxed = |e: &Expr, table: &mut CodelistTable| Box::new(serialize_expr(e, table));
    match expr {
        Expr::ForEveryActivity(inner) => SerializedExpr::ForEveryActivity(boxed(inner, table)),
        Expr::IfThen {
            condition,
            consequence,
        } => SerializedExpr::IfThen(boxed(condition, table), boxed(consequence, table)),
        Expr::Either(a, b) => SerializedExpr::Either(boxed(a, table), boxed(b, table)),
        Expr::Both(a, b) => SerializedExpr::Both(boxed(a, table), boxed(b, table)),
        Expr::ForEach {
            quantifier,
            path,
            body,
        } => SerializedExpr::ForEach {
            quantifier: serialize_quantifier(*quantifier),
            path: path.query().to_owned(),
            body: boxed(body, table),
        },
        Expr::IsOneOf { path, choices } => SerializedExpr::IsOneOf {
            path: path.query().to_owned(),
            choices: choices.clone(),
        },
        Expr::IsPast { path } => SerializedExpr::IsPast(path.query().to_owned()),
        Expr::Exists { path } => SerializedExpr::Exists(path.query().to_owned()),
        Expr::NotExists { path } => SerializedExpr::NotExists(path.query().to_owned()),
        Expr::Equals { path, value } => SerializedExpr::Equals {
            path: path.query().to_owned(),
            value: *value,
        },
        Expr::IsNot {
            path,
            phrasing,
            value,
        } => SerializedExpr::IsNot {
            path: path.query().to_owned(),
            phrasing: serialize_phrasing(*phrasing),
            value: serialize_operand(value, table),
        },
        Expr::IsBefore { earlier, later } => SerializedExpr::IsBefore {
            earlier: earlier.query().to_owned(),
            later: later.query().to_owned(),
        },
        Expr::IsAtLeast {
            path,
            phrasing,
            min,
        } => SerializedExpr::IsAtLeast {
            path: path.query().to_owned(),
            phrasing: serialize_phrasing(*phrasing),
            min: *min,
        },
        Expr::StartsWith { path, prefix } => SerializedExpr::StartsWith {
            path: path.query().to_owned(),
            prefix: prefix.query().to_owned(),
        },
        Expr::IsOnList {
            quantifier,
            path,
            codelist,
        } => SerializedExpr::IsOnList {
            quantifier: serialize_quantifier(*quantifier),
            path: path.query().to_owned(),
            codelist: table.slot(codelist),
        },
        Expr::MoreThanChars { path, min } => SerializedExpr::MoreThanChars {
            path: path.query().to_owned(),
            min: *min,
        },
        Expr::LessThanMonthsAgo { path, months } => SerializedExpr::LessThanMonthsAgo {
            path: path.query().to_owned(),
            months: *months,
        },
        Expr::AvailableForward { path, period } => SerializedExpr::AvailableForward {
            path: path.query().to_owned(),
            period: serialize_period(*period),
        },
        Expr::MatchesRegex { path, pattern } => SerializedExpr::MatchesRegex {
            path: path.query().to_owned(),
            pattern: pattern.as_str().to_owned(),
        },
    }
}

fn ruleset_to_serialized(ruleset: &RuleSet, source_text: Option<&str>) -> SerializedRuleSet {
    let mut table = CodelistTable::default();
    let rules: Vec<SerializedRule> = ruleset
        .iter()
        .map(|rule| SerializedRule {
            id: rule.id().to_owned(),
            source: rule.source().to_owned(),
            expr: serialize_expr(rule.expr(), &mut table),
        })
        .collect();

    SerializedRuleSet {
        metadata: RuleSetMetadata {
            rule_count: rules.len(),
            codelist_count: table.lists.len(),
            source_digest: source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes()),
        },
        codelists: table.lists,
        rules,
    }
}

// ---------------------------------------------------------------------------
// Serialized -> RuleSet
// ---------------------------------------------------------------------------

fn pattern(source: &str) -> Result<Pattern, DeserializeError> {
    Regex::new(source)
        .map(Pattern::new)
        .map_err(|e| DeserializeError::Validation(format!("invalid regex '{source}': {e}")))
}

fn deserialize_operand(
    operand: SerializedOperand,
    lists: &[Arc<Codelist>],
) -> Result<Operand, DeserializeError> {
    Ok(match operand {
        SerializedOperand::Path(p) => Operand::Path(PathRef::new(p)),
        SerializedOperand::Integer(n) => Operand::Integer(n),
        SerializedOperand::IntegerList(ns) => Operand::IntegerList(ns),
        SerializedOperand::Code(c) => Operand::Code(c),
        SerializedOperand::Codelist(slot) => Operand::Codelist(Arc::clone(&lists[slot])),
        SerializedOperand::Pattern(p) => Operand::Pattern(pattern(&p)?),
    })
}

fn deserialize_expr(
    expr: SerializedExpr,
    lists: &[Arc<Codelist>],
) -> Result<Expr, DeserializeError> {
    let boxed = |e: Box<SerializedExpr>| deserialize_expr(*e, lists).map(Box::new);
    Ok(match expr {
        SerializedExpr::ForEveryActivity(inner) => Expr::ForEveryActivity(boxed(inner)?),
        SerializedExpr::IfThen(condition, consequence) => Expr::IfThen {
            condition: boxed(condition)?,
            consequence: boxed(consequence)?,
        },
        SerializedExpr::Either(a, b) => Expr::Either(boxed(a)?, boxed(b)?),
        SerializedExpr::Both(a, b) => Expr::Both(boxed(a)?, boxed(b)?),
        SerializedExpr::ForEach {
            quantifier,
            path,
            body,
        } => Expr::ForEach {
            quantifier: deserialize_quantifier(quantifier),
            path: PathRef::new(path),
            body: boxed(body)?,
        },
        SerializedExpr::IsOneOf { path, choices } => Expr::IsOneOf {
            path: PathRef::new(path),
            choices,
        },
        SerializedExpr::IsPast(path) => Expr::IsPast {
            path: PathRef::new(path),
        },
        SerializedExpr::Exists(path) => Expr::Exists {
            path: PathRef::new(path),
        },
        SerializedExpr::NotExists(path) => Expr::NotExists {
            path: PathRef::new(path),
        },
        SerializedExpr::Equals { path, value } => Expr::Equals {
            path: PathRef::new(path),
            value,
        },
        SerializedExpr::IsNot {
            path,
            phrasing,
            value,
        } => Expr::IsNot {
            path: PathRef::new(path),
            phrasing: deserialize_phrasing(phrasing),
            value: deserialize_operand(value, lists)?,
        },
        SerializedExpr::IsBefore { earlier, later } => Expr::IsBefore {
            earlier: PathRef::new(earlier),
            later: PathRef::new(later),
        },
        SerializedExpr::IsAtLeast {
            path,
            phrasing,
            min,
        } => Expr::IsAtLeast {
            path: PathRef::new(path),
            phrasing: deserialize_phrasing(phrasing),
            min,
        },
        SerializedExpr::StartsWith { path, prefix } => Expr::StartsWith {
            path: PathRef::new(path),
            prefix: PathRef::new(prefix),
        },
        SerializedExpr::IsOnList {
            quantifier,
            path,
            codelist,
        } => Expr::IsOnList {
            quantifier: deserialize_quantifier(quantifier),
            path: PathRef::new(path),
            codelist: Arc::clone(&lists[codelist]),
        },
        SerializedExpr::MoreThanChars { path, min } => Expr::MoreThanChars {
            path: PathRef::new(path),
            min,
        },
        SerializedExpr::LessThanMonthsAgo { path, months } => Expr::LessThanMonthsAgo {
            path: PathRef::new(path),
            months,
        },
        SerializedExpr::AvailableForward { path, period } => Expr::AvailableForward {
            path: PathRef::new(path),
            period: deserialize_period(period),
        },
        SerializedExpr::MatchesRegex { path, pattern: p } => Expr::MatchesRegex {
            path: PathRef::new(path),
            pattern: pattern(&p)?,
        },
    })
}

fn serialized_to_ruleset(ser: SerializedRuleSet) -> Result<RuleSet, DeserializeError> {
    validate(&ser)?;

    let lists: Vec<Arc<Codelist>> = ser
        .codelists
        .into_iter()
        .map(|list| Arc::new(Codelist::new(list.name, list.codes)))
        .collect();

    let rules = ser
        .rules
        .into_iter()
        .map(|rule| {
            Ok(CompiledRule {
                id: rule.id,
                source: rule.source,
                expr: deserialize_expr(rule.expr, &lists)?,
            })
        })
        .collect::<Result<Vec<_>, DeserializeError>>()?;

    Ok(RuleSet::new(rules))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedRuleSet) -> Result<(), DeserializeError> {
    if ser.metadata.rule_count != ser.rules.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} rules but payload has {}",
            ser.metadata.rule_count,
            ser.rules.len()
        )));
    }
    if ser.metadata.codelist_count != ser.codelists.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} codelists but payload has {}",
            ser.metadata.codelist_count,
            ser.codelists.len()
        )));
    }

    let mut ids = HashSet::new();
    for rule in &ser.rules {
        if !ids.insert(rule.id.as_str()) {
            return Err(DeserializeError::Validation(format!(
                "duplicate rule id '{}'",
                rule.id
            )));
        }
        validate_expr(&rule.expr, ser.codelists.len())?;
    }
    Ok(())
}

fn validate_slot(slot: usize, codelist_count: usize) -> Result<(), DeserializeError> {
    if slot >= codelist_count {
        return Err(DeserializeError::Validation(format!(
            "codelist slot {slot} out of bounds (max {codelist_count})"
        )));
    }
    Ok(())
}

fn validate_expr(expr: &SerializedExpr, codelist_count: usize) -> Result<(), DeserializeError> {
    match expr {
        SerializedExpr::ForEveryActivity(inner) | SerializedExpr::ForEach { body: inner, .. } => {
            validate_expr(inner, codelist_count)
        }
        SerializedExpr::IfThen(a, b) | SerializedExpr::Either(a, b) | SerializedExpr::Both(a, b) => {
            validate_expr(a, codelist_count)?;
            validate_expr(b, codelist_count)
        }
        SerializedExpr::IsOnList { codelist, .. } => validate_slot(*codelist, codelist_count),
        SerializedExpr::IsNot {
            value: SerializedOperand::Codelist(slot),
            ..
        } => validate_slot(*slot, codelist_count),
        SerializedExpr::IsOneOf { choices, .. } if choices.is_empty() => Err(
            DeserializeError::Validation("empty choice list".to_owned()),
        ),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags
    #[allow(clippy::cast_possible_truncation)]
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
}

#[allow(clippy::cast_possible_truncation)]
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }
    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    ruleset: &RuleSet,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let serialized = ruleset_to_serialized(ruleset, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<RuleSet, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_end = HEADER_SIZE + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[HEADER_SIZE..payload_end];

    if blake3::hash(payload).as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedRuleSet, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_ruleset(serialized)
}
