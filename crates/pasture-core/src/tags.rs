//! Resolution of the HTML tag set stripped from scraped pages.
//!
//! A source's effective set is derived from the global `remove_tags` policy
//! and the source's own override string. Override tokens are comma separated;
//! a leading `-` removes the tag from the base set, anything else adds it:
//!
//! ```text
//! effective = base ∪ additions \ removals
//! ```
//!
//! Because removals are applied as a set difference after the union, the
//! result does not depend on token order, and a tag both added and negated in
//! the same override ends up removed.

use std::collections::BTreeSet;

pub type TagSet = BTreeSet<String>;

/// Tags stripped when neither a global policy nor an override is configured.
pub const DEFAULT_REMOVE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
];

pub fn default_tags() -> TagSet {
    DEFAULT_REMOVE_TAGS.iter().map(|t| t.to_string()).collect()
}

/// Parsed form of a `remove_tags` override string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOverride {
    pub additions: TagSet,
    pub removals: TagSet,
}

impl TagOverride {
    pub fn parse(raw: &str) -> Self {
        let mut parsed = TagOverride::default();
        for token in tokens(raw) {
            match token.strip_prefix('-') {
                Some(negated) => {
                    let negated = negated.trim();
                    if !negated.is_empty() {
                        parsed.removals.insert(negated.to_string());
                    }
                }
                None => {
                    parsed.additions.insert(token);
                }
            }
        }
        parsed
    }

    pub fn apply(&self, base: &TagSet) -> TagSet {
        base.union(&self.additions)
            .filter(|tag| !self.removals.contains(*tag))
            .cloned()
            .collect()
    }
}

/// Parse a plain tag list (the global policy). Negated tokens have no
/// meaning here and are ignored.
pub fn parse_tag_list(raw: &str) -> TagSet {
    tokens(raw).filter(|t| !t.starts_with('-')).collect()
}

/// `global ∪ additions \ removals`; `global` verbatim when no override.
pub fn resolve(global: &TagSet, override_tags: Option<&str>) -> TagSet {
    match override_tags {
        Some(raw) => TagOverride::parse(raw).apply(global),
        None => global.clone(),
    }
}

/// Effective set for one source. [`DEFAULT_REMOVE_TAGS`] is used only when
/// there is neither a global policy nor an override; an override without a
/// global policy starts from an empty base.
pub fn effective_tags(global: Option<&TagSet>, override_tags: Option<&str>) -> TagSet {
    match (global, override_tags) {
        (Some(global), _) => resolve(global, override_tags),
        (None, Some(_)) => resolve(&TagSet::new(), override_tags),
        (None, None) => default_tags(),
    }
}

fn tokens(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
}
