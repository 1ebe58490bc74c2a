use crate::ai::{build_prompt, Language, PromptInput, Summarizer};
use crate::cache::{KeyValueStore, Resolution, SummaryCache};
use crate::config::Config;
use crate::db::SqliteStore;
use crate::error::{AppError, Result};
use crate::models::{Provider, SummaryRecord};
use crate::services::{is_summarizable_url, ContentFetcher, PageContent};

/// Options for one summarization run. Unset fields fall back to the config.
#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    pub url: String,
    pub user_hint: String,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub language: Option<Language>,
    /// Skip the cache and always call the model.
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Cached(Resolution),
    Generated(SummaryRecord),
}

impl SummaryOutcome {
    pub fn record(&self) -> &SummaryRecord {
        match self {
            SummaryOutcome::Cached(resolution) => &resolution.record,
            SummaryOutcome::Generated(record) => record,
        }
    }
}

/// Ties page extraction, the chat model and the summary cache together.
pub struct App<S = SqliteStore> {
    config: Config,
    cache: SummaryCache<S>,
    fetcher: ContentFetcher,
}

impl App<SqliteStore> {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(&config.db_path).await?;
        Self::with_store(config, store)
    }
}

impl<S: KeyValueStore> App<S> {
    pub fn with_store(config: &Config, store: S) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            cache: SummaryCache::with_history_limit(store, config.history_limit),
            fetcher: ContentFetcher::new()?,
        })
    }

    /// Cached summary for a page, if any step of the lookup chain matches.
    pub async fn cached(&self, url: &str, title: &str) -> Result<Option<Resolution>> {
        self.cache.resolve(url, title).await
    }

    pub async fn page_history(&self, url: &str) -> Result<Vec<SummaryRecord>> {
        self.cache.page_history(url).await
    }

    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<SummaryOutcome> {
        if !is_summarizable_url(&request.url) {
            return Err(AppError::UnsupportedPage(request.url.clone()));
        }
        // A URL-only hit needs no network; the title is checked after fetching.
        if let Some(hit) = self.same_page_hit(request, &request.url, "").await? {
            return Ok(SummaryOutcome::Cached(hit));
        }

        let page = self.fetcher.fetch_page(&request.url).await?;
        self.summarize_page(page, request).await
    }

    /// Serves a same-page cache hit unless a fresh run or a custom hint was
    /// requested; otherwise generates and stores a new summary.
    pub async fn summarize_page(
        &self,
        page: PageContent,
        request: &SummarizeRequest,
    ) -> Result<SummaryOutcome> {
        if let Some(hit) = self.same_page_hit(request, &page.url, &page.title).await? {
            return Ok(SummaryOutcome::Cached(hit));
        }

        let summarizer = self.summarizer_for(request)?;
        let language = request
            .language
            .unwrap_or_else(|| Language::parse(&self.config.language));

        let prompt = build_prompt(&PromptInput {
            content: &page.text,
            title: &page.title,
            url: &page.url,
            user_hint: &request.user_hint,
            language,
        });

        let markdown = summarizer.generate_summary(&prompt).await?;
        let record = SummaryRecord::new(
            page.url,
            page.title,
            summarizer.provider().as_str(),
            summarizer.model(),
            request.user_hint.clone(),
            markdown,
        );

        self.cache.record_and_store(record.clone()).await?;
        Ok(SummaryOutcome::Generated(record))
    }

    async fn same_page_hit(
        &self,
        request: &SummarizeRequest,
        url: &str,
        title: &str,
    ) -> Result<Option<Resolution>> {
        if request.fresh || !request.user_hint.trim().is_empty() {
            return Ok(None);
        }

        let hit = self.cache.resolve(url, title).await?;
        Ok(hit.filter(|hit| hit.step.is_same_page()).inspect(|hit| {
            tracing::debug!("Serving cached summary for {} via {}", url, hit.step.as_str());
        }))
    }

    fn summarizer_for(&self, request: &SummarizeRequest) -> Result<Summarizer> {
        let provider = match request.provider {
            Some(provider) => provider,
            None => self.config.provider.parse()?,
        };

        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.model_for(provider));

        let api_key = request
            .api_key
            .clone()
            .or_else(|| self.config.api_key_for(provider))
            .ok_or_else(|| AppError::MissingApiKey(provider.to_string()))?;

        Summarizer::new(provider, api_key, model)
    }
}
