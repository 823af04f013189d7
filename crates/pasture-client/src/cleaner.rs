use htmd::HtmlToMarkdown;
use pasture_core::error::AppError;
use pasture_core::tags::TagSet;
use pasture_core::traits::Cleaner;
use scraper::{Html, Selector};

/// HTML-to-Markdown cleaner using htmd.
///
/// Only the page `<title>` and `<body>` are converted. Tags in the effective
/// tag set are dropped together with their content. The converter is built
/// per call because the tag set differs between sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmdCleaner;

impl HtmdCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str, remove_tags: &TagSet) -> Result<String, AppError> {
        let document = title_and_body(html);

        let mut builder = HtmlToMarkdown::builder();
        // htmd rejects an empty skip list.
        if !remove_tags.is_empty() {
            builder = builder.skip_tags(remove_tags.iter().map(String::as_str).collect());
        }
        let converter = builder.build();

        converter
            .convert(&document)
            .map(|md| md.trim().to_string())
            .map_err(|e| AppError::CleanerError(e.to_string()))
    }
}

/// `<h1>title</h1>` followed by the body markup. Falls back to the input
/// when the page has no body element.
fn title_and_body(html: &str) -> String {
    let document = Html::parse_document(html);

    let title = first_match(&document, "title")
        .map(|el| el.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let body = first_match(&document, "body")
        .map(|el| el.inner_html())
        .unwrap_or_else(|| html.to_string());

    match title {
        Some(title) => format!("<h1>{}</h1>\n{body}", escape(&title)),
        None => body,
    }
}

fn first_match<'a>(document: &'a Html, css: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
