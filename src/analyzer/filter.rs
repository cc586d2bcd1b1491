//! Content filtering applied to messages before they leave the process.
//!
//! Some classification services reject whole requests when a message
//! contains certain terms. The filter rewrites those terms up front so the
//! rest of the session can still be classified.
//!
//! Each term carries a [`RedactionPolicy`]. Longer terms are applied first so
//! that a term containing another is not half-rewritten.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Marker substituted for masked terms when nothing else is configured.
pub const DEFAULT_MARKER: &str = "**";

/// Terms filtered when the configuration does not name any.
pub const DEFAULT_TERMS: &[&str] = &[
    "suicide",
    "violence",
    "pornography",
    "gambling",
    "自杀",
    "暴力",
    "色情",
    "赌博",
];

/// What to do with a matched term.
///
/// In TOML: `"mask"`, `"remove"` or `{ replace = "text" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionPolicy {
    /// Substitute the filter's marker.
    Mask,
    /// Delete the term.
    Remove,
    /// Substitute the given text.
    Replace(String),
}

/// A term -> policy rewriting table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFilter {
    marker: String,
    rules: Vec<(String, RedactionPolicy)>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::masking(DEFAULT_TERMS.iter().copied(), DEFAULT_MARKER)
    }
}

impl ContentFilter {
    /// Build a filter from an explicit term table.
    ///
    /// Empty terms are ignored.
    pub fn new(marker: impl Into<String>, terms: BTreeMap<String, RedactionPolicy>) -> Self {
        let mut rules: Vec<(String, RedactionPolicy)> =
            terms.into_iter().filter(|(term, _)| !term.is_empty()).collect();
        rules.sort_by(|a, b| {
            b.0.chars()
                .count()
                .cmp(&a.0.chars().count())
                .then_with(|| a.0.cmp(&b.0))
        });

        Self {
            marker: marker.into(),
            rules,
        }
    }

    /// Build a filter that masks every term with `marker`.
    pub fn masking<'a>(terms: impl IntoIterator<Item = &'a str>, marker: &str) -> Self {
        let table = terms
            .into_iter()
            .map(|t| (t.to_string(), RedactionPolicy::Mask))
            .collect();
        Self::new(marker, table)
    }

    /// A filter that leaves text untouched.
    pub fn disabled() -> Self {
        Self::new(DEFAULT_MARKER, BTreeMap::new())
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Rewrite `text`, borrowing it unchanged when nothing matches.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);

        for (term, policy) in &self.rules {
            if !out.contains(term.as_str()) {
                continue;
            }
            let substitute = match policy {
                RedactionPolicy::Mask => self.marker.as_str(),
                RedactionPolicy::Remove => "",
                RedactionPolicy::Replace(with) => with.as_str(),
            };
            out = Cow::Owned(out.replace(term.as_str(), substitute));
        }

        out
    }
}
