//! URL normalization and fingerprinting, the deduplication key of the pipeline.
//!
//! [`normalize`] removes tracking query parameters and the fragment so that
//! links differing only by campaign tags collapse to one string;
//! [`fingerprint`] is the SHA-256 of that string.

use url::Url;

use crate::models::compute_hash;

/// Query keys (lowercase) that never carry content.
pub const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "dclid",
    "gbraid",
    "wbraid",
    "msclkid",
    "yclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "mkt_tok",
    "_hsenc",
    "_hsmi",
    "ref",
    "ref_src",
    "ref_url",
    "ref_source",
    "referrer",
    "spm",
    "cmpid",
];

/// Any key starting with this prefix is tracking (`utm_source`, `utm_medium`, ...).
pub const TRACKING_PREFIX: &str = "utm_";

pub const MEDIA_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "ico", "svg", "avif", "heic",
    // video
    "mp4", "m4v", "webm", "mov", "avi", "mkv", "wmv", "flv",
    // audio
    "mp3", "m4a", "aac", "wav", "ogg", "oga", "flac", "opus",
];

/// Hosts that only ever serve binary media.
pub const MEDIA_HOSTS: &[&str] = &["i.redd.it", "v.redd.it", "i.imgur.com"];

/// Canonical form of a URL for deduplication.
///
/// Remaining query segments keep their order and encoding. Input that does
/// not parse as an absolute URL is returned trimmed.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let kept = url.query().map(|query| {
        query
            .split('&')
            .filter(|segment| !segment.is_empty() && !is_tracking_segment(segment))
            .collect::<Vec<_>>()
            .join("&")
    });

    match kept {
        Some(q) if !q.is_empty() => url.set_query(Some(&q)),
        _ => url.set_query(None),
    }

    url.into()
}

/// SHA-256 (hex) of the normalized URL.
pub fn fingerprint(raw: &str) -> String {
    compute_hash(&normalize(raw))
}

/// True for links pointing at images, video or audio. Such links are skipped
/// by the pipeline without being fingerprinted.
pub fn is_media_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };

    if let Some(host) = url.host_str()
        && MEDIA_HOSTS.contains(&host)
    {
        return true;
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_tracking_segment(segment: &str) -> bool {
    let key = url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(k, _)| k.to_ascii_lowercase())
        .unwrap_or_default();
    key.starts_with(TRACKING_PREFIX) || TRACKING_PARAMS.contains(&key.as_str())
}
