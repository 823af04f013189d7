//! Source ("pasture") abstraction.
//!
//! Every variant fetches raw entries into [`Item`]s, declares its structural
//! exclusions as a static table of [`Exclusion`] rules, and says which item
//! fields the blacklist is matched against. Filtering itself is shared code
//! that walks the table, so adding a rule to a variant never touches it.

pub mod feed;
pub mod hackernews;
pub mod reddit;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::config::SourceConfig;
use crate::error::AppError;
use crate::models::{Item, SourceKind};

pub use feed::FeedPasture;
pub use hackernews::HackerNewsPasture;
pub use reddit::RedditPasture;

/// Inputs available to exclusion rules besides the item itself.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext {
    pub now: DateTime<Utc>,
    pub max_age_days: Option<u32>,
}

/// A named structural exclusion. `applies` returns true when the item must
/// be dropped.
#[derive(Debug, Clone, Copy)]
pub struct Exclusion {
    pub name: &'static str,
    pub applies: fn(&Item, &FilterContext) -> bool,
}

/// Item fields the blacklist terms are matched against. The title is always
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlacklistScope {
    Title,
    TitleAndUrl,
    TitleAndDescription,
}

/// Result of filtering one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<Item>,
    /// Rule name -> number of items it dropped.
    pub excluded: BTreeMap<&'static str, usize>,
    /// Blacklist term -> number of items it dropped (first matching term).
    pub blacklisted: BTreeMap<String, usize>,
}

impl FilterOutcome {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }

    pub fn blacklisted_total(&self) -> usize {
        self.blacklisted.values().sum()
    }
}

pub mod rules {
    //! Exclusion rules shared by the built-in variants.

    use super::{Exclusion, FilterContext};
    use crate::models::Item;

    pub const PINNED: Exclusion = Exclusion {
        name: "pinned",
        applies: is_pinned,
    };

    pub const SELF_POST: Exclusion = Exclusion {
        name: "self-post",
        applies: is_self_post,
    };

    pub const JOB_LISTING: Exclusion = Exclusion {
        name: "job-listing",
        applies: is_job,
    };

    pub const EXPIRED: Exclusion = Exclusion {
        name: "expired",
        applies: is_expired,
    };

    fn is_pinned(item: &Item, _: &FilterContext) -> bool {
        item.flags.pinned
    }

    fn is_self_post(item: &Item, _: &FilterContext) -> bool {
        item.flags.self_post
    }

    fn is_job(item: &Item, _: &FilterContext) -> bool {
        item.flags.job
    }

    /// Undated items are never expired.
    fn is_expired(item: &Item, ctx: &FilterContext) -> bool {
        match (ctx.max_age_days, item.published_at) {
            (Some(days), Some(published)) => {
                ctx.now.signed_duration_since(published).num_days() > i64::from(days)
            }
            _ => false,
        }
    }
}

/// A configured content source.
#[async_trait]
pub trait Pasture: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn config(&self) -> &SourceConfig;

    /// Endpoint actually queried (configured or variant default).
    fn endpoint(&self) -> &str;

    fn exclusions(&self) -> &'static [Exclusion] {
        &[]
    }

    fn blacklist_scope(&self) -> BlacklistScope {
        BlacklistScope::Title
    }

    /// Retrieve raw items, surfacing network and parse failures.
    async fn try_fetch(&self) -> Result<Vec<Item>, AppError>;

    /// Retrieve raw items; failures are logged and yield an empty list.
    async fn fetch(&self) -> Vec<Item> {
        match self.try_fetch().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(source = %self.name(), error = %e, "Fetch failed");
                Vec::new()
            }
        }
    }

    fn filter(&self, items: Vec<Item>) -> Vec<Item> {
        self.filter_with_outcome(items, Utc::now()).kept
    }

    fn filter_with_outcome(&self, items: Vec<Item>, now: DateTime<Utc>) -> FilterOutcome {
        let ctx = FilterContext {
            now,
            max_age_days: self.config().max_age_days,
        };
        apply_filters(
            items,
            self.exclusions(),
            &self.config().blacklist,
            self.blacklist_scope(),
            &ctx,
        )
    }

    /// The external URL to scrape for an item.
    fn extract_url<'a>(&self, item: &'a Item) -> &'a str {
        &item.external_url
    }

    /// `<base>/<YYYY>/<MM>/<DD>/<name>` for today's local date.
    fn output_partition(&self, base_dir: &Path) -> PathBuf {
        partition_for(base_dir, Local::now().date_naive(), self.name())
    }
}

pub fn partition_for(base_dir: &Path, date: NaiveDate, source: &str) -> PathBuf {
    base_dir
        .join(date.format("%Y").to_string())
        .join(date.format("%m").to_string())
        .join(date.format("%d").to_string())
        .join(source)
}

/// Structural exclusions first, then the blacklist.
pub fn apply_filters(
    items: Vec<Item>,
    exclusions: &[Exclusion],
    blacklist: &[String],
    scope: BlacklistScope,
    ctx: &FilterContext,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    'items: for item in items {
        for rule in exclusions {
            if (rule.applies)(&item, ctx) {
                *outcome.excluded.entry(rule.name).or_default() += 1;
                continue 'items;
            }
        }

        if let Some(term) = blacklist_hit(&item, blacklist, scope) {
            *outcome.blacklisted.entry(term.to_string()).or_default() += 1;
            continue;
        }

        outcome.kept.push(item);
    }

    outcome
}

/// First blacklist term found (case-insensitive substring) in the scoped fields.
pub fn blacklist_hit<'a>(
    item: &Item,
    blacklist: &'a [String],
    scope: BlacklistScope,
) -> Option<&'a str> {
    if blacklist.is_empty() {
        return None;
    }

    let title = item.title.to_lowercase();
    let extra = match scope {
        BlacklistScope::Title => None,
        BlacklistScope::TitleAndUrl => Some(item.external_url.to_lowercase()),
        BlacklistScope::TitleAndDescription => item.description.as_deref().map(str::to_lowercase),
    };

    blacklist
        .iter()
        .map(String::as_str)
        .filter(|term| !term.is_empty())
        .find(|term| {
            let term = term.to_lowercase();
            title.contains(&term) || extra.as_deref().is_some_and(|e| e.contains(&term))
        })
}

/// Reads a required endpoint or fails with a configuration error naming the section.
pub(crate) fn require_endpoint(config: &SourceConfig) -> Result<String, AppError> {
    config
        .endpoint
        .clone()
        .ok_or_else(|| AppError::invalid_source(&config.name, "missing required 'url'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemFlags;
    use chrono::TimeDelta;

    fn ctx(max_age_days: Option<u32>) -> FilterContext {
        FilterContext {
            now: Utc::now(),
            max_age_days,
        }
    }

    fn terms(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blacklist_matches_title_case_insensitively() {
        let item = Item::new("1", "Breaking: POLITICS today", "https://example.com/a");
        assert_eq!(
            blacklist_hit(&item, &terms(&["politics"]), BlacklistScope::Title),
            Some("politics")
        );
        assert_eq!(
            blacklist_hit(&item, &terms(&["sports"]), BlacklistScope::Title),
            None
        );
    }

    #[test]
    fn blacklist_scope_controls_extra_fields() {
        let item = Item::new("1", "Neutral title", "https://crypto.example.com/a")
            .with_description("all about NFTs");
        let list = terms(&["crypto", "nft"]);
        assert_eq!(blacklist_hit(&item, &list, BlacklistScope::Title), None);
        assert_eq!(
            blacklist_hit(&item, &list, BlacklistScope::TitleAndUrl),
            Some("crypto")
        );
        assert_eq!(
            blacklist_hit(&item, &list, BlacklistScope::TitleAndDescription),
            Some("nft")
        );
    }

    #[test]
    fn exclusions_run_before_blacklist_and_are_counted() {
        let pinned = Item::new("1", "Megathread politics", "https://a").with_flags(ItemFlags {
            pinned: true,
            ..Default::default()
        });
        let blacklisted = Item::new("2", "Politics news", "https://b");
        let clean = Item::new("3", "Science", "https://c");

        let outcome = apply_filters(
            vec![pinned, blacklisted, clean],
            &[rules::PINNED, rules::SELF_POST],
            &terms(&["politics"]),
            BlacklistScope::Title,
            &ctx(None),
        );

        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.kept[0].id, "3");
        assert_eq!(outcome.excluded.get("pinned"), Some(&1));
        assert_eq!(outcome.blacklisted.get("politics"), Some(&1));
        assert_eq!(outcome.excluded_total(), 1);
        assert_eq!(outcome.blacklisted_total(), 1);
    }

    #[test]
    fn expired_rule_respects_max_age_and_keeps_undated() {
        let now = Utc::now();
        let old = Item::new("old", "Old", "https://a").published(now - TimeDelta::days(10));
        let fresh = Item::new("new", "New", "https://b").published(now - TimeDelta::hours(5));
        let undated = Item::new("undated", "Undated", "https://c");

        let outcome = apply_filters(
            vec![old, fresh, undated],
            &[rules::EXPIRED],
            &[],
            BlacklistScope::Title,
            &ctx(Some(3)),
        );
        let ids: Vec<_> = outcome.kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "undated"]);
        assert_eq!(outcome.excluded.get("expired"), Some(&1));
    }

    #[test]
    fn expired_rule_counts_whole_days() {
        let context = ctx(Some(3));
        let at = |age: TimeDelta| Item::new("x", "X", "https://a").published(context.now - age);

        let three_and_a_half = at(TimeDelta::days(3) + TimeDelta::hours(12));
        assert!(!(rules::EXPIRED.applies)(&three_and_a_half, &context));

        let four = at(TimeDelta::days(4));
        assert!((rules::EXPIRED.applies)(&four, &context));
    }

    #[test]
    fn expired_rule_is_inert_without_max_age() {
        let old = Item::new("old", "Old", "https://a").published(Utc::now() - TimeDelta::days(400));
        let outcome = apply_filters(
            vec![old],
            &[rules::EXPIRED],
            &[],
            BlacklistScope::Title,
            &ctx(None),
        );
        assert_eq!(outcome.kept.len(), 1);
    }

    #[test]
    fn partition_layout_is_date_then_source() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            partition_for(Path::new("output"), date, "worldnews"),
            PathBuf::from("output/2024/03/07/worldnews")
        );
    }
}
