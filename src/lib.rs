//! Web page summaries from chat-completion models, with a multi-index
//! summary cache that resolves lookups through a same-page fallback chain.

pub mod ai;
pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use app::{App, SummarizeRequest, SummaryOutcome};
pub use cache::{KeyValueStore, MemoryStore, SummaryCache};
pub use error::{AppError, Result};
pub use models::SummaryRecord;
