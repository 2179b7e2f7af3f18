use std::{borrow::Cow, collections::HashMap, sync::LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Matches a `{{name}}` placeholder. The name may not contain braces, so an
/// unbalanced `{{` never swallows a later placeholder.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern is valid"));

/// A flat set of variables substituted into request files.
///
/// Values are looked up by name when a `{{name}}` placeholder is found in a
/// line of a request file. An environment is never mutated while a document
/// is being parsed, so it can be shared freely between threads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(HashMap<String, String>);

impl Environment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Binds `name` to `value`, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// The number of variables in the environment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the environment has no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the variables, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replaces every `{{name}}` placeholder in `text` with its value.
    ///
    /// Whitespace just inside the braces is ignored when looking up the name,
    /// so `{{ host }}` resolves `host`. Placeholders naming an unknown
    /// variable, and unbalanced braces, are left exactly as written.
    ///
    /// Substitution runs before any structure is parsed, so an unresolved
    /// placeholder is still part of the text the parser sees. On a request
    /// line, `GET {{ host }}/users` with no `host` defined keeps its inner
    /// spaces and splits into four fields, which is a malformed request line.
    ///
    /// Input without any `{{` is returned borrowed, without allocating.
    #[must_use]
    pub fn substitute<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains("{{") {
            return Cow::Borrowed(text);
        }

        PLACEHOLDER.replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            match self.get(name) {
                Some(value) => value.to_owned(),
                None => caps[0].to_owned(),
            }
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
