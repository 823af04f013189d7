//! Maps a [`SourceConfig`] to a concrete [`Pasture`].
//!
//! An explicit `type` wins. Otherwise the endpoint is matched against an
//! ordered list of predicates, and the first hit names the variant. Sources
//! with no endpoint and no type fall back to the subreddit variant.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::config::SourceConfig;
use crate::error::AppError;
use crate::models::SourceKind;
use crate::pasture::{FeedPasture, HackerNewsPasture, Pasture, RedditPasture};
use crate::traits::Fetcher;

pub const FALLBACK_TYPE: &str = "reddit";

/// Builds a source from its section and the shared fetcher.
pub type Constructor<F> =
    Arc<dyn Fn(SourceConfig, F) -> Result<Box<dyn Pasture>, AppError> + Send + Sync>;

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

struct InferenceRule {
    matches: Predicate,
    source_type: String,
}

pub struct PastureFactory<F> {
    fetcher: F,
    constructors: HashMap<String, Constructor<F>>,
    rules: Vec<InferenceRule>,
}

impl<F: Fetcher> PastureFactory<F> {
    /// Factory with the built-in variants and inference rules.
    pub fn new(fetcher: F) -> Self {
        let mut factory = Self {
            fetcher,
            constructors: HashMap::new(),
            rules: Vec::new(),
        };

        factory.register("reddit", |config, fetcher| {
            Ok(Box::new(RedditPasture::new(config, fetcher)?))
        });
        factory.register("hackernews", |config, fetcher| {
            Ok(Box::new(HackerNewsPasture::new(config, fetcher)?))
        });
        for alias in ["rss", "feed", "atom"] {
            factory.register(alias, |config, fetcher| {
                Ok(Box::new(FeedPasture::new(config, fetcher)?))
            });
        }

        factory.rules = vec![
            rule(is_reddit_feed, "rss"),
            rule(is_reddit, "reddit"),
            rule(is_hackernews, "hackernews"),
            rule(looks_like_feed, "rss"),
        ];
        factory
    }

    /// Add or replace a variant. Type names are case-insensitive.
    pub fn register<C>(&mut self, source_type: &str, constructor: C)
    where
        C: Fn(SourceConfig, F) -> Result<Box<dyn Pasture>, AppError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(source_type.trim().to_lowercase(), Arc::new(constructor));
    }

    /// Add an inference rule checked before the built-in ones.
    pub fn infer_with<P>(&mut self, predicate: P, source_type: &str)
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(
            0,
            InferenceRule {
                matches: Arc::new(predicate),
                source_type: source_type.trim().to_lowercase(),
            },
        );
    }

    /// Registered type names, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Type name a section resolves to, before construction.
    pub fn resolve_type(&self, config: &SourceConfig) -> String {
        if let Some(explicit) = config.source_type.as_deref() {
            return explicit.trim().to_lowercase();
        }

        let Some(endpoint) = config.endpoint.as_deref() else {
            return FALLBACK_TYPE.to_string();
        };
        let endpoint = endpoint.to_lowercase();

        self.rules
            .iter()
            .find(|rule| (rule.matches)(&endpoint))
            .map(|rule| rule.source_type.clone())
            .unwrap_or_else(|| FALLBACK_TYPE.to_string())
    }

    pub fn create(&self, config: &SourceConfig) -> Result<Box<dyn Pasture>, AppError> {
        let source_type = self.resolve_type(config);
        let constructor = self.constructors.get(&source_type).ok_or_else(|| {
            AppError::invalid_source(
                &config.name,
                format!(
                    "unknown source type '{source_type}' (known: {})",
                    self.registered_types().join(", ")
                ),
            )
        })?;

        let pasture = constructor(config.clone(), self.fetcher.clone())?;

        if config.max_age_days.is_some() && pasture.kind() != SourceKind::Feed {
            tracing::warn!(
                source = %config.name,
                kind = %pasture.kind(),
                "max_age_days only applies to feed sources; ignoring"
            );
        }
        tracing::debug!(source = %config.name, %source_type, endpoint = %pasture.endpoint(), "Source created");
        Ok(pasture)
    }
}

fn rule(matches: fn(&str) -> bool, source_type: &str) -> InferenceRule {
    InferenceRule {
        matches: Arc::new(matches),
        source_type: source_type.to_string(),
    }
}

fn is_reddit_feed(url: &str) -> bool {
    is_reddit(url) && (url.ends_with(".rss") || url.ends_with(".xml"))
}

fn is_reddit(url: &str) -> bool {
    url.contains("reddit.com")
}

fn is_hackernews(url: &str) -> bool {
    ["hackernews", "news.ycombinator.com", "hacker-news.firebaseio.com"]
        .iter()
        .any(|pattern| url.contains(pattern))
}

/// Path segments that name a feed.
const FEED_SEGMENTS: &[&str] = &["rss", "feed", "feeds", "atom"];
const FEED_EXTENSIONS: &[&str] = &["rss", "xml", "atom"];

/// Matches on whole path segments only, never on the host.
fn looks_like_feed(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase(),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let named = segments.iter().any(|s| FEED_SEGMENTS.contains(s));
    let extension = segments
        .last()
        .and_then(|last| last.rsplit_once('.'))
        .is_some_and(|(_, ext)| FEED_EXTENSIONS.contains(&ext));

    named || extension
}
