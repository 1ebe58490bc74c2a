use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;

use crate::error::{AppError, Result};

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Longest page text sent to the model, in characters.
pub const MAX_CONTENT_CHARS: usize = 15_000;

/// Text and metadata extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub text: String,
}

/// Only plain web pages can be fetched and summarized.
pub fn is_summarizable_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub struct ContentFetcher {
    client: Client,
}

impl ContentFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a page and extract its title and readable text
    pub async fn fetch_page(&self, page_url: &str) -> Result<PageContent> {
        if !is_summarizable_url(page_url) {
            return Err(AppError::UnsupportedPage(page_url.to_string()));
        }

        let response = self.client.get(page_url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Extract(format!(
                "{} returned HTTP {}",
                page_url,
                response.status()
            )));
        }

        let html = response.text().await?;
        let page = extract_page(&html, page_url)?;
        tracing::debug!("Extracted {} chars from {}", page.text.chars().count(), page_url);
        Ok(page)
    }
}

/// Extract title and cleaned, length-capped text from an HTML document
pub fn extract_page(html: &str, url: &str) -> Result<PageContent> {
    let text = html2text::from_read(html.as_bytes(), 100)
        .map_err(|e| AppError::Extract(format!("failed to convert HTML to text: {e}")))?;

    let text = truncate_chars(&clean_text(&text), MAX_CONTENT_CHARS);
    if text.is_empty() {
        return Err(AppError::Extract(format!("no readable text at {url}")));
    }

    Ok(PageContent {
        url: url.to_string(),
        title: extract_title(html).unwrap_or_default(),
        text,
    })
}

fn extract_title(html: &str) -> Option<String> {
    static TITLE_RE: OnceLock<Regex> = OnceLock::new();
    let re = TITLE_RE.get_or_init(|| {
        Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid")
    });

    let raw = re.captures(html)?.get(1)?.as_str();
    let title = html2text::from_read(raw.as_bytes(), 1000)
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|_| raw.trim().to_string());
    Some(title).filter(|t| !t.is_empty())
}

/// Collapse tabs, non-breaking spaces and runs of blank lines
fn clean_text(text: &str) -> String {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    let [tabs, trailing, blank_lines] = PATTERNS.get_or_init(|| {
        [
            Regex::new(r"[\t\r\u{00A0}]+").expect("tab regex is valid"),
            Regex::new(r"[ ]+\n").expect("trailing-space regex is valid"),
            Regex::new(r"\n{3,}").expect("blank-line regex is valid"),
        ]
    });

    let text = tabs.replace_all(text, " ");
    let text = trailing.replace_all(&text, "\n");
    let text = blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_summarizable_url() {
        assert!(is_summarizable_url("https://a.com"));
        assert!(is_summarizable_url("HTTP://A.COM/x"));
        assert!(!is_summarizable_url("chrome://extensions"));
        assert!(!is_summarizable_url("file:///tmp/a.html"));
        assert!(!is_summarizable_url(""));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("a\tb\u{00A0}c   \n\n\n\nd  "), "a b c\n\nd");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_extract_page() {
        let html = r#"<html><head><title>
            My  Page &amp; More
        </title></head><body><p>First paragraph.</p><p>Second paragraph.</p></body></html>"#;
        let page = extract_page(html, "https://a.com/p").unwrap();
        assert_eq!(page.title, "My Page & More");
        assert!(page.text.contains("First paragraph."));
        assert!(page.text.contains("Second paragraph."));
    }

    #[test]
    fn test_extract_page_caps_length() {
        let body = "word ".repeat(MAX_CONTENT_CHARS);
        let html = format!("<html><body><p>{body}</p></body></html>");
        let page = extract_page(&html, "https://a.com").unwrap();
        assert_eq!(page.text.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(page.title, "");
    }

    #[test]
    fn test_extract_empty_page_fails() {
        assert!(matches!(
            extract_page("<html><body></body></html>", "https://a.com"),
            Err(AppError::Extract(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http() {
        let fetcher = ContentFetcher::new().unwrap();
        assert!(matches!(
            fetcher.fetch_page("about:blank").await,
            Err(AppError::UnsupportedPage(_))
        ));
    }
}
