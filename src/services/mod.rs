mod content_fetcher;

pub use content_fetcher::{is_summarizable_url, ContentFetcher, PageContent};
