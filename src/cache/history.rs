//! Bounded, most-recent-first log of stored summaries.

use std::cmp::Reverse;

use super::normalize::normalize_url;
use crate::models::SummaryRecord;

/// Default bound on the history log.
pub const HISTORY_LIMIT: usize = 500;

/// Entries returned by a per-page history listing.
pub const PAGE_HISTORY_LIMIT: usize = 5;

/// Two records are the same entry when they were produced for the same
/// normalized page by the same provider, model and hint, with identical output.
pub fn is_same_entry(a: &SummaryRecord, b: &SummaryRecord) -> bool {
    a.markdown == b.markdown
        && a.user_hint == b.user_hint
        && a.model == b.model
        && a.provider == b.provider
        && normalize_url(&a.url) == normalize_url(&b.url)
}

/// Drops every entry equal to `record`, prepends it, then truncates to `limit`.
pub fn push_front(
    history: Vec<SummaryRecord>,
    record: SummaryRecord,
    limit: usize,
) -> Vec<SummaryRecord> {
    let mut next = Vec::with_capacity(limit.min(history.len() + 1));
    next.push(record);
    for entry in history {
        if next.len() >= limit {
            break;
        }
        if !is_same_entry(&entry, &next[0]) {
            next.push(entry);
        }
    }
    next.truncate(limit);
    next
}

/// Entries for the page at `url`, newest `updated_at` first, at most `limit`.
pub fn entries_for_page(history: &[SummaryRecord], url: &str, limit: usize) -> Vec<SummaryRecord> {
    let norm = normalize_url(url);
    let mut entries: Vec<SummaryRecord> = history
        .iter()
        .filter(|r| normalize_url(&r.url) == norm)
        .cloned()
        .collect();
    entries.sort_by_key(|r| Reverse(r.updated_at));
    entries.truncate(limit);
    entries
}
