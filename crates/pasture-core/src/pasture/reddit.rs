use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use super::{Exclusion, Pasture, rules};
use crate::config::SourceConfig;
use crate::error::AppError;
use crate::models::{Item, ItemFlags, SourceKind};
use crate::traits::Fetcher;

pub const REDDIT_BASE: &str = "https://www.reddit.com";

const EXCLUSIONS: &[Exclusion] = &[rules::PINNED, rules::SELF_POST];

/// `https://www.reddit.com/r/<name>/.json`
pub fn default_endpoint(name: &str) -> String {
    format!("{REDDIT_BASE}/r/{name}/.json")
}

/// Subreddit JSON listing. Stickied and self posts are excluded.
pub struct RedditPasture<F> {
    config: SourceConfig,
    endpoint: String,
    fetcher: F,
}

impl<F: Fetcher> RedditPasture<F> {
    /// Without a configured `url` the section name is taken as the subreddit.
    pub fn new(config: SourceConfig, fetcher: F) -> Result<Self, AppError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(&config.name));
        Ok(Self {
            config,
            endpoint,
            fetcher,
        })
    }
}

#[async_trait]
impl<F: Fetcher> Pasture for RedditPasture<F> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Subreddit
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn exclusions(&self) -> &'static [Exclusion] {
        EXCLUSIONS
    }

    async fn try_fetch(&self) -> Result<Vec<Item>, AppError> {
        let body = self.fetcher.fetch(&self.endpoint).await?;
        let items = parse_listing(&body)?;
        tracing::info!(source = %self.config.name, count = items.len(), "Fetched posts");
        Ok(items)
    }
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    url: Option<String>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    is_self: bool,
    created_utc: Option<f64>,
}

/// Parse a listing document (`{"data": {"children": [{"data": {...}}]}}`).
pub fn parse_listing(body: &str) -> Result<Vec<Item>, AppError> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|e| AppError::ParseError(format!("Invalid subreddit listing: {e}")))?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| post_to_item(child.data))
        .collect())
}

fn post_to_item(post: Post) -> Item {
    let link = post
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| post.permalink.clone());

    let mut item = Item::new(post.id, post.title, absolutize(&link)).with_flags(ItemFlags {
        pinned: post.stickied,
        self_post: post.is_self,
        job: false,
    });

    if !post.selftext.trim().is_empty() {
        item.description = Some(post.selftext);
    }
    item.published_at = post
        .created_utc
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));
    item
}

/// Listing links are HTML-escaped and may be relative to reddit.com.
fn absolutize(link: &str) -> String {
    let link = link.trim().replace("&amp;", "&");
    if link.starts_with('/') {
        format!("{REDDIT_BASE}{link}")
    } else {
        link
    }
}
