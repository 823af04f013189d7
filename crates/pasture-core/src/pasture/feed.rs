use async_trait::async_trait;
use feed_rs::model::Entry;

use super::{BlacklistScope, Exclusion, Pasture, require_endpoint, rules};
use crate::config::SourceConfig;
use crate::error::AppError;
use crate::models::{Item, SourceKind};
use crate::traits::Fetcher;

const EXCLUSIONS: &[Exclusion] = &[rules::EXPIRED];

/// RSS 2.0, Atom or RDF feed. Requires an endpoint.
pub struct FeedPasture<F> {
    config: SourceConfig,
    endpoint: String,
    fetcher: F,
}

impl<F: Fetcher> FeedPasture<F> {
    pub fn new(config: SourceConfig, fetcher: F) -> Result<Self, AppError> {
        let endpoint = require_endpoint(&config)?;
        Ok(Self {
            config,
            endpoint,
            fetcher,
        })
    }
}

#[async_trait]
impl<F: Fetcher> Pasture for FeedPasture<F> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Feed
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
        BlacklistScope::TitleAndDescription
    }

    async fn try_fetch(&self) -> Result<Vec<Item>, AppError> {
        let body = self.fetcher.fetch(&self.endpoint).await?;
        let items = parse_feed(&body)?;
        tracing::info!(source = %self.config.name, count = items.len(), "Fetched feed items");
        Ok(items)
    }
}

/// Parse a feed document. Entries without a title or a link are dropped.
pub fn parse_feed(body: &str) -> Result<Vec<Item>, AppError> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| AppError::ParseError(format!("Invalid feed: {e}")))?;
    Ok(feed.entries.into_iter().filter_map(entry_to_item).collect())
}

fn entry_to_item(entry: Entry) -> Option<Item> {
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let url = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
        .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .filter(|d| !d.trim().is_empty());

    let id = if entry.id.is_empty() {
        url.clone()
    } else {
        entry.id
    };

    let mut item = Item::new(id, title, url);
    item.description = description;
    item.published_at = entry.published.or(entry.updated);
    Some(item)
}
