use crate::error::AppError;
use crate::tags::TagSet;
use crate::traits::{Cleaner, Fetcher, Scraper};

/// Fetch a page, then convert it to Markdown with the given tags removed.
///
/// Generic over both halves so tests can run without a network or browser.
#[derive(Clone)]
pub struct PageScraper<F, C>
where
    F: Fetcher,
    C: Cleaner,
{
    fetcher: F,
    cleaner: C,
}

impl<F, C> PageScraper<F, C>
where
    F: Fetcher,
    C: Cleaner,
{
    pub fn new(fetcher: F, cleaner: C) -> Self {
        Self { fetcher, cleaner }
    }
}

impl<F, C> Scraper for PageScraper<F, C>
where
    F: Fetcher,
    C: Cleaner,
{
    async fn scrape(&self, url: &str, remove_tags: &TagSet) -> Result<String, AppError> {
        tracing::debug!(%url, "Fetching page");
        let html = self.fetcher.fetch(url).await?;

        let markdown = self.cleaner.clean(&html, remove_tags)?;
        tracing::debug!(
            %url,
            html_bytes = html.len(),
            markdown_bytes = markdown.len(),
            "Cleaned page"
        );

        if markdown.trim().is_empty() {
            return Err(AppError::ScrapeError(format!("No content extracted from {url}")));
        }
        Ok(markdown)
    }
}
