//! TOML configuration: one table per source plus a reserved `[global]` table.
//!
//! ```toml
//! [global]
//! remove_tags = "script, style, nav"
//! blacklist = "sponsored"
//!
//! [worldnews]
//! url = "https://www.reddit.com/r/worldnews/.json"
//! blacklist = "politics, election"
//! remove_tags = "-nav, form"
//! interval = 30
//!
//! [lwn]
//! type = "rss"
//! url = "https://lwn.net/headlines/rss"
//! max_age_days = 3
//! ```
//!
//! Sources keep the order in which their tables appear in the file.

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::tags::{self, TagSet};

pub const GLOBAL_SECTION: &str = "global";

/// Interval substituted for sources whose `interval` value cannot be read.
pub const FALLBACK_INTERVAL_MINUTES: u64 = 60;

/// Longest accepted `interval`: one year.
pub const MAX_INTERVAL_MINUTES: u64 = 366 * 24 * 60;

/// Settings applied to every source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalPolicy {
    /// Base tag set; `None` when the global table has no `remove_tags`.
    pub remove_tags: Option<TagSet>,
    /// Terms merged into every source's blacklist.
    pub blacklist: Vec<String>,
}

/// One configured source section.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    /// Raw `type` value; inferred from the endpoint when absent.
    pub source_type: Option<String>,
    pub endpoint: Option<String>,
    /// Lowercase terms, global terms first.
    pub blacklist: Vec<String>,
    /// Raw override string (`"-nav, form"`).
    pub remove_tags: Option<String>,
    /// Positive minutes; `None` when absent or not positive.
    pub interval_minutes: Option<u64>,
    pub max_age_days: Option<u32>,
    pub limit: Option<usize>,
    /// Keys this crate does not know, for third-party variants.
    pub extra: toml::Table,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: None,
            endpoint: None,
            blacklist: Vec::new(),
            remove_tags: None,
            interval_minutes: None,
            max_age_days: None,
            limit: None,
            extra: toml::Table::new(),
        }
    }

    pub fn with_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_blacklist(mut self, terms: &[&str]) -> Self {
        self.blacklist = terms.iter().map(|t| t.to_lowercase()).collect();
        self
    }

    pub fn with_interval(mut self, minutes: u64) -> Self {
        self.interval_minutes = (minutes > 0).then_some(minutes);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub global: GlobalPolicy,
    pub sources: Vec<SourceConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        let table: toml::Table = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Invalid TOML: {e}")))?;

        let mut global = GlobalPolicy::default();
        let mut sources = Vec::new();

        for (name, value) in table {
            if !value.is_table() {
                return Err(AppError::Config(format!(
                    "top-level key '{name}' is not a section; put it under [{GLOBAL_SECTION}] or a source"
                )));
            }

            if name == GLOBAL_SECTION {
                let raw: RawGlobal = value
                    .try_into()
                    .map_err(|e| AppError::invalid_source(GLOBAL_SECTION, e.to_string()))?;
                global = GlobalPolicy {
                    remove_tags: raw.remove_tags.map(|t| tags::parse_tag_list(&t.joined())),
                    blacklist: raw.blacklist.map(StringOrList::terms).unwrap_or_default(),
                };
                continue;
            }

            validate_name(&name)?;
            let raw: RawSource = value
                .try_into()
                .map_err(|e| AppError::invalid_source(&name, e.to_string()))?;
            sources.push(raw.into_source(name)?);
        }

        for source in &mut sources {
            source.blacklist = merge_terms(&global.blacklist, &source.blacklist);
        }

        Ok(Self { global, sources })
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Tag set for one source, computed fresh on every call.
    pub fn effective_tags(&self, source: &SourceConfig) -> TagSet {
        tags::effective_tags(self.global.remove_tags.as_ref(), source.remove_tags.as_deref())
    }
}

/// Source names become directory names.
fn validate_name(name: &str) -> Result<(), AppError> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(AppError::invalid_source(
            name,
            "section name must be usable as a directory name",
        ));
    }
    Ok(())
}

fn merge_terms(global: &[String], own: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(global.len() + own.len());
    for term in global.iter().chain(own) {
        if !merged.contains(term) {
            merged.push(term.clone());
        }
    }
    merged
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn joined(self) -> String {
        match self {
            StringOrList::One(s) => s,
            StringOrList::Many(v) => v.join(","),
        }
    }

    fn terms(self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for term in self.joined().split(',') {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !out.contains(&term) {
                out.push(term);
            }
        }
        out
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
struct RawGlobal {
    remove_tags: Option<StringOrList>,
    blacklist: Option<StringOrList>,
}

#[derive(Deserialize)]
struct RawSource {
    #[serde(rename = "type")]
    source_type: Option<String>,
    #[serde(alias = "endpoint")]
    url: Option<String>,
    blacklist: Option<StringOrList>,
    remove_tags: Option<StringOrList>,
    interval: Option<IntOrString>,
    max_age_days: Option<IntOrString>,
    limit: Option<i64>,
    #[serde(flatten)]
    extra: toml::Table,
}

impl RawSource {
    fn into_source(self, name: String) -> Result<SourceConfig, AppError> {
        let interval_minutes = match self.interval {
            None => None,
            Some(IntOrString::Int(n)) => u64::try_from(n).ok().filter(|n| *n > 0),
            Some(IntOrString::Text(raw)) => match raw.trim().parse::<i64>() {
                Ok(n) => u64::try_from(n).ok().filter(|n| *n > 0),
                Err(_) if raw.trim().is_empty() => None,
                Err(_) => {
                    tracing::warn!(
                        source = %name,
                        interval = %raw,
                        "Invalid interval, using {FALLBACK_INTERVAL_MINUTES} minutes"
                    );
                    Some(FALLBACK_INTERVAL_MINUTES)
                }
            },
        };
        if let Some(minutes) = interval_minutes.filter(|m| *m > MAX_INTERVAL_MINUTES) {
            return Err(AppError::invalid_source(
                &name,
                format!("interval must be at most {MAX_INTERVAL_MINUTES} minutes, got {minutes}"),
            ));
        }

        let max_age_days = match self.max_age_days {
            None => None,
            Some(IntOrString::Int(n)) => u32::try_from(n).ok(),
            Some(IntOrString::Text(raw)) => match raw.trim().parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    tracing::warn!(source = %name, max_age_days = %raw, "Ignoring invalid max_age_days");
                    None
                }
            },
        };

        let limit = match self.limit {
            None => None,
            Some(n) if n > 0 => Some(n as usize),
            Some(n) => {
                return Err(AppError::invalid_source(
                    &name,
                    format!("limit must be positive, got {n}"),
                ));
            }
        };

        Ok(SourceConfig {
            source_type: self
                .source_type
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
            endpoint: self
                .url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            blacklist: self.blacklist.map(StringOrList::terms).unwrap_or_default(),
            remove_tags: self.remove_tags.map(StringOrList::joined),
            interval_minutes,
            max_age_days,
            limit,
            extra: self.extra,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[global]
remove_tags = "script, style, nav"
blacklist = "Sponsored"

[worldnews]
url = "https://www.reddit.com/r/worldnews/.json"
blacklist = "politics, Election"
remove_tags = "-nav, form"
interval = 30

[lwn]
type = "RSS"
endpoint = "https://lwn.net/headlines/rss"
max_age_days = 3

[hn]
type = "hackernews"
limit = 20
"#;

    #[test]
    fn parses_sections_in_file_order() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let names: Vec<_> = config.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["worldnews", "lwn", "hn"]);
    }

    #[test]
    fn parses_global_policy() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let tags = config.global.remove_tags.as_ref().unwrap();
        assert_eq!(tags.len(), 3);
        assert!(tags.contains("nav"));
        assert_eq!(config.global.blacklist, vec!["sponsored".to_string()]);
    }

    #[test]
    fn merges_global_blacklist_into_sources() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let wn = config.source("worldnews").unwrap();
        assert_eq!(wn.blacklist, vec!["sponsored", "politics", "election"]);
        let lwn = config.source("lwn").unwrap();
        assert_eq!(lwn.blacklist, vec!["sponsored"]);
    }

    #[test]
    fn parses_source_fields() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let lwn = config.source("lwn").unwrap();
        assert_eq!(lwn.source_type.as_deref(), Some("rss"));
        assert_eq!(lwn.endpoint.as_deref(), Some("https://lwn.net/headlines/rss"));
        assert_eq!(lwn.max_age_days, Some(3));
        assert_eq!(lwn.interval_minutes, None);

        let hn = config.source("hn").unwrap();
        assert_eq!(hn.limit, Some(20));
        assert!(hn.endpoint.is_none());
    }

    #[test]
    fn effective_tags_merge_global_and_override() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let tags = config.effective_tags(config.source("worldnews").unwrap());
        let expected: TagSet = ["script", "style", "form"].iter().map(|s| s.to_string()).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn override_without_global_policy_uses_only_its_own_tags() {
        let config = Config::from_toml_str("[blog]\nurl = \"x\"\nremove_tags = \"form\"\n[plain]\nurl = \"x\"\n").unwrap();
        let blog = config.effective_tags(config.source("blog").unwrap());
        assert_eq!(blog, TagSet::from(["form".to_string()]));
        let plain = config.effective_tags(config.source("plain").unwrap());
        assert_eq!(plain, tags::default_tags());
    }

    #[test]
    fn empty_global_policy_strips_nothing() {
        let config = Config::from_toml_str("[global]\nremove_tags = \"\"\n[blog]\nurl = \"x\"\n").unwrap();
        assert!(config.effective_tags(config.source("blog").unwrap()).is_empty());
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let err = Config::from_toml_str("[a]\nurl = \"x\"\ninterval = 4294967296\n").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("interval"));

        let max = format!("[a]\nurl = \"x\"\ninterval = {MAX_INTERVAL_MINUTES}\n");
        let config = Config::from_toml_str(&max).unwrap();
        assert_eq!(config.sources[0].interval_minutes, Some(MAX_INTERVAL_MINUTES));
    }

    #[test]
    fn interval_zero_negative_or_blank_is_absent() {
        let config = Config::from_toml_str(
            "[a]\nurl = \"x\"\ninterval = 0\n[b]\nurl = \"x\"\ninterval = -5\n[c]\nurl = \"x\"\ninterval = \"\"\n",
        )
        .unwrap();
        assert!(config.sources.iter().all(|s| s.interval_minutes.is_none()));
    }

    #[test]
    fn interval_accepts_strings_and_falls_back_when_garbled() {
        let config = Config::from_toml_str(
            "[a]\nurl = \"x\"\ninterval = \"15\"\n[b]\nurl = \"x\"\ninterval = \"soon\"\n",
        )
        .unwrap();
        assert_eq!(config.source("a").unwrap().interval_minutes, Some(15));
        assert_eq!(
            config.source("b").unwrap().interval_minutes,
            Some(FALLBACK_INTERVAL_MINUTES)
        );
    }

    #[test]
    fn blacklist_accepts_arrays() {
        let config =
            Config::from_toml_str("[a]\nurl = \"x\"\nblacklist = [\"Crypto\", \" nft \", \"\"]\n")
                .unwrap();
        assert_eq!(config.source("a").unwrap().blacklist, vec!["crypto", "nft"]);
    }

    #[test]
    fn unknown_keys_are_kept_as_extra() {
        let config = Config::from_toml_str("[a]\nurl = \"x\"\ncolour = \"blue\"\n").unwrap();
        let extra = &config.source("a").unwrap().extra;
        assert_eq!(extra.get("colour").and_then(|v| v.as_str()), Some("blue"));
    }

    #[test]
    fn rejects_top_level_scalars() {
        let err = Config::from_toml_str("remove_tags = \"nav\"\n").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("remove_tags"));
    }

    #[test]
    fn rejects_names_that_are_not_directory_safe() {
        let err = Config::from_toml_str("[\"a/b\"]\nurl = \"x\"\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidSource { ref section, .. } if section == "a/b"));
    }

    #[test]
    fn rejects_non_positive_limit() {
        let err = Config::from_toml_str("[hn]\ntype = \"hackernews\"\nlimit = 0\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidSource { ref section, .. } if section == "hn"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Config::from_toml_str("[a\nurl=").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn empty_file_has_no_sources() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.sources.is_empty());
        assert!(config.global.remove_tags.is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
