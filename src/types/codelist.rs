use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// A named vocabulary of valid code strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    name: String,
    codes: BTreeSet<String>,
}

impl Codelist {
    pub fn new<I, S>(name: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Membership test that also accepts the lower- and upper-cased forms of
    /// `code`.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
            || self.codes.contains(&code.to_lowercase())
            || self.codes.contains(&code.to_uppercase())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl fmt::Display for Codelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} codelist", self.name)
    }
}

/// Registry of codelists keyed by name, supplied wholesale before compilation.
///
/// Compiled rules hold `Arc` handles into the registry, so a registry can be
/// dropped once compilation is done.
#[derive(Debug, Clone, Default)]
pub struct Codelists {
    lists: HashMap<String, Arc<Codelist>>,
}

impl Codelists {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a codelist, replacing any previous list with the same name.
    #[must_use]
    pub fn with<I, S>(mut self, name: &str, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(Codelist::new(name, codes));
        self
    }

    pub fn insert(&mut self, list: Codelist) {
        self.lists.insert(list.name.clone(), Arc::new(list));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Codelist>> {
        self.lists.get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl<S, I, C> FromIterator<(S, I)> for Codelists
where
    S: Into<String>,
    I: IntoIterator<Item = C>,
    C: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        let mut lists = Codelists::new();
        for (name, codes) in iter {
            lists.insert(Codelist::new(name, codes));
        }
        lists
    }
}
