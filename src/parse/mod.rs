mod error;
mod grammar;

pub use error::GrammarError;
pub(crate) use grammar::{grammar, group, Production};

/// Normalise rule text before matching: drop `*` bullet markers at the start
/// of lines, collapse runs of whitespace to single spaces and trim.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.trim_start();
            line.strip_prefix('*').unwrap_or(line)
        })
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
