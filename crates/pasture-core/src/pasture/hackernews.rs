use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use super::{BlacklistScope, Exclusion, Pasture, rules};
use crate::config::SourceConfig;
use crate::error::AppError;
use crate::models::{Item, ItemFlags, SourceKind};
use crate::traits::Fetcher;

pub const DEFAULT_ENDPOINT: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
const DEFAULT_ITEM_BASE: &str = "https://hacker-news.firebaseio.com/v0/item/";
const DISCUSSION_BASE: &str = "https://news.ycombinator.com/item?id=";

/// Stories inspected per pass when `limit` is not configured.
pub const DEFAULT_LIMIT: usize = 50;

const EXCLUSIONS: &[Exclusion] = &[rules::JOB_LISTING, rules::SELF_POST];

/// Hacker News via the Firebase API: a story id list, then one request per story.
pub struct HackerNewsPasture<F> {
    config: SourceConfig,
    endpoint: String,
    item_base: String,
    limit: usize,
    fetcher: F,
}

impl<F: Fetcher> HackerNewsPasture<F> {
    pub fn new(config: SourceConfig, fetcher: F) -> Result<Self, AppError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let item_base = item_base_for(&endpoint);
        let limit = config.limit.unwrap_or(DEFAULT_LIMIT);
        Ok(Self {
            config,
            endpoint,
            item_base,
            limit,
            fetcher,
        })
    }

    async fn fetch_story(&self, id: u64) -> Result<Option<Story>, AppError> {
        let body = self
            .fetcher
            .fetch(&format!("{}{id}.json", self.item_base))
            .await?;
        serde_json::from_str::<Option<Story>>(&body)
            .map_err(|e| AppError::ParseError(format!("Invalid story {id}: {e}")))
    }
}

/// `.../v0/newstories.json` -> `.../v0/item/`.
fn item_base_for(endpoint: &str) -> String {
    match endpoint.rsplit_once('/') {
        Some((prefix, last)) if last.ends_with("stories.json") => format!("{prefix}/item/"),
        _ => DEFAULT_ITEM_BASE.to_string(),
    }
}

#[async_trait]
impl<F: Fetcher> Pasture for HackerNewsPasture<F> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Aggregator
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

    fn blacklist_scope(&self) -> BlacklistScope {
        BlacklistScope::TitleAndUrl
    }

    async fn try_fetch(&self) -> Result<Vec<Item>, AppError> {
        let body = self.fetcher.fetch(&self.endpoint).await?;
        let ids: Vec<u64> = serde_json::from_str(&body)
            .map_err(|e| AppError::ParseError(format!("Invalid story id list: {e}")))?;

        let mut items = Vec::new();
        for id in ids.into_iter().take(self.limit) {
            match self.fetch_story(id).await {
                Ok(Some(story)) if !story.deleted && !story.dead => items.push(story.into_item()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(source = %self.config.name, story = id, error = %e, "Skipping story");
                }
            }
        }

        tracing::info!(source = %self.config.name, count = items.len(), "Fetched stories");
        Ok(items)
    }
}

#[derive(Deserialize)]
struct Story {
    id: u64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    url: Option<String>,
    text: Option<String>,
    time: Option<i64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

impl Story {
    /// Stories without a link (Ask HN, polls) point at their discussion page
    /// and are flagged as self posts.
    fn into_item(self) -> Item {
        let link = self.url.filter(|u| !u.trim().is_empty());
        let flags = ItemFlags {
            pinned: false,
            self_post: link.is_none(),
            job: self.kind == "job",
        };
        let url = link.unwrap_or_else(|| format!("{DISCUSSION_BASE}{}", self.id));

        let mut item = Item::new(self.id.to_string(), self.title, url).with_flags(flags);
        item.description = self.text;
        item.published_at = self.time.and_then(|t| DateTime::from_timestamp(t, 0));
        item
    }
}
