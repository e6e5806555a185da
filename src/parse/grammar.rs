use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Every surface construct the rule language recognises.
///
/// Leaf productions yield value operands; the rest yield verdict nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Production {
    ForEveryActivity,
    IfThen,
    IsOneOf,
    Codelist,
    Regex,
    Path,
    Integer,
    IntegerList,
    Code,
    ForEach,
    IsPast,
    Either,
    Both,
    NotExists,
    Equals,
    IsNot,
    IsBefore,
    IsAtLeast,
    Exists,
    StartsWith,
    IsOnList,
    IsOnNamedList,
    MoreThanChars,
    LessThanMonthsAgo,
    AvailableForward,
    MatchesRegex,
}

// Declaration order is precedence: the first entry whose pattern matches the
// whole text wins. Conditionals must precede the connectives, the
// connectives must precede the operators whose operands they would otherwise
// swallow, and the leaves are tried early because they are cheap and exact.
const TABLE: &[(&str, Production)] = &[
    (r"^for every activity, (.*)$", Production::ForEveryActivity),
    (r"^if (.*) then (.*)$", Production::IfThen),
    (r"^(`[^`]+`) is one of \((.*)\)$", Production::IsOneOf),
    (r"^\S* codelist$", Production::Codelist),
    (r"^regex `.*`$", Production::Regex),
    (r"^`[^`]+`$", Production::Path),
    (r"^\d+$", Production::Integer),
    (r"^\d+(?:, \d+)+$", Production::IntegerList),
    (r"^[A-Z]+\d+$", Production::Code),
    (
        r"^for (at least one|every) (`[^`]+`), (.*)$",
        Production::ForEach,
    ),
    (
        r"^(`[^`]+`) (?:should be|is) today, or in the past$",
        Production::IsPast,
    ),
    (r"^(.*)(?: or|\. Alternatively,) (.*)$", Production::Either),
    (r"^(.*) (?:and|but) (.*)$", Production::Both),
    (
        r"^(`[^`]+`) (?:should not be|is not) present$",
        Production::NotExists,
    ),
    (r"^(`[^`]+`) is (\d+)$", Production::Equals),
    (r"^(`[^`]+`) (should not be|is not) (\S*)$", Production::IsNot),
    (
        r"^(`[^`]+`) (?:should be|is) chronologically before (`[^`]+`)$",
        Production::IsBefore,
    ),
    (
        r"^(`[^`]+`) (should be|is) at least (\d+)$",
        Production::IsAtLeast,
    ),
    (r"^(`[^`]+`) (?:should be|is) present$", Production::Exists),
    (
        r"^(`[^`]+`) (?:should start|starts) with (`[^`]+`)$",
        Production::StartsWith,
    ),
    (
        r"^(at least one|every) (`[^`]+`) (?:should be|is) on the (\S* codelist)$",
        Production::IsOnList,
    ),
    (
        r"^(`[^`]+`) (?:should be|is) on list (\S+)$",
        Production::IsOnNamedList,
    ),
    (
        r"^(`[^`]+`) (?:should have|has) more than (\d+) characters$",
        Production::MoreThanChars,
    ),
    (
        r"^(.*) (?:should be|is) less than (\d+) months ago$",
        Production::LessThanMonthsAgo,
    ),
    (
        r"^(`[^`]+`) (?:should be|is) available forward (annually|quarterly)$",
        Production::AvailableForward,
    ),
    (
        r"^(`[^`]+`) (?:should match|matches) the (regex .*)$",
        Production::MatchesRegex,
    ),
];

/// The ordered grammar table, built once per process.
pub(crate) struct Grammar {
    entries: Vec<(Regex, Production)>,
}

impl Grammar {
    fn build() -> Self {
        let entries = TABLE
            .iter()
            .map(|&(pattern, production)| {
                let regex = Regex::new(pattern).expect("grammar table patterns are valid");
                (regex, production)
            })
            .collect();
        Self { entries }
    }

    /// Find the first production whose pattern matches `text`.
    pub(crate) fn first_match<'t>(&self, text: &'t str) -> Option<(Production, Captures<'t>)> {
        self.entries
            .iter()
            .find_map(|(regex, production)| regex.captures(text).map(|caps| (*production, caps)))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(Grammar::build)
}

/// Capture group `i` as a string slice; groups in the table always
/// participate in a successful match.
pub(crate) fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}
