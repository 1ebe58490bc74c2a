mod provider;
mod summary;

pub use provider::Provider;
pub use summary::SummaryRecord;
