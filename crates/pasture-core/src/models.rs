use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// The family a configured source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Subreddit-style JSON listing.
    Subreddit,
    /// Link aggregator API (Hacker News).
    Aggregator,
    /// RSS / Atom / RDF syndication feed.
    Feed,
    /// A variant registered by a third party.
    Custom,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Subreddit => "subreddit",
            SourceKind::Aggregator => "aggregator",
            SourceKind::Feed => "feed",
            SourceKind::Custom => "custom",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural markers set by the source parser, consumed by exclusion rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFlags {
    /// Pinned / stickied / announcement entry.
    pub pinned: bool,
    /// Text-only post without an external link.
    pub self_post: bool,
    /// Job listing.
    pub job: bool,
}

/// One fetched entry. Lives for a single pass only.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub external_url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub flags: ItemFlags,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            external_url: url.into(),
            description: None,
            published_at: None,
            flags: ItemFlags::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
