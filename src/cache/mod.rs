mod engine;
mod history;
mod normalize;
mod resolve;
mod store;

pub use engine::{Resolution, SummaryCache};
pub use history::{HISTORY_LIMIT, PAGE_HISTORY_LIMIT};
pub use normalize::{normalize_title, normalize_url};
pub use resolve::MatchStep;
pub use store::{KeyValueStore, MemoryStore, UpdateFn};
