//! Lookup fallback chain.
//!
//! Each step is a plain matcher over a [`CacheSnapshot`]; the chain is an
//! ordered list evaluated until the first hit. Steps widen the match from
//! the exact URL, through same-page heuristics, to the most recent summary
//! of any page.

use std::cmp::Reverse;
use std::collections::HashMap;

use super::normalize::{host_of, normalize_title, normalize_url};
use crate::models::SummaryRecord;

/// In-memory view of the four stored collections.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub exact: HashMap<String, SummaryRecord>,
    pub normalized: HashMap<String, SummaryRecord>,
    pub origin_title: HashMap<String, SummaryRecord>,
    pub history: Vec<SummaryRecord>,
}

/// A lookup request with its derived keys computed once.
#[derive(Debug, Clone)]
pub struct Query {
    pub url: String,
    pub title: String,
    pub normalized_url: String,
    pub host: Option<String>,
}

impl Query {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            normalized_url: normalize_url(url),
            host: host_of(url),
        }
    }

    fn origin_title_key(&self) -> Option<String> {
        self.host
            .as_ref()
            .filter(|host| !host.is_empty())
            .map(|host| format!("{host}|{}", normalize_title(&self.title)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    ExactUrl,
    NormalizedUrl,
    OriginTitle,
    HistoryUrl,
    HistoryOriginTitle,
    MostRecent,
}

impl MatchStep {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStep::ExactUrl => "exact url",
            MatchStep::NormalizedUrl => "normalized url",
            MatchStep::OriginTitle => "host and title",
            MatchStep::HistoryUrl => "history (normalized url)",
            MatchStep::HistoryOriginTitle => "history (host and title)",
            MatchStep::MostRecent => "most recent summary (any page)",
        }
    }

    /// `false` only for the last-resort step, whose record may belong to a
    /// different page.
    pub fn is_same_page(self) -> bool {
        !matches!(self, MatchStep::MostRecent)
    }
}

pub type Matcher = for<'s> fn(&'s CacheSnapshot, &Query) -> Option<&'s SummaryRecord>;

pub const FALLBACK_CHAIN: &[(MatchStep, Matcher)] = &[
    (MatchStep::ExactUrl, match_exact_url),
    (MatchStep::NormalizedUrl, match_normalized_url),
    (MatchStep::OriginTitle, match_origin_title),
    (MatchStep::HistoryUrl, match_history_url),
    (MatchStep::HistoryOriginTitle, match_history_origin_title),
    (MatchStep::MostRecent, match_most_recent),
];

/// Runs the chain, returning the first hit and the step that produced it.
pub fn resolve<'s>(
    snapshot: &'s CacheSnapshot,
    query: &Query,
) -> Option<(MatchStep, &'s SummaryRecord)> {
    FALLBACK_CHAIN.iter().find_map(|(step, matcher)| {
        let hit = matcher(snapshot, query);
        tracing::debug!(step = step.as_str(), hit = hit.is_some(), url = %query.url, "cache step");
        hit.map(|record| (*step, record))
    })
}

fn match_exact_url<'s>(snapshot: &'s CacheSnapshot, query: &Query) -> Option<&'s SummaryRecord> {
    snapshot.exact.get(&query.url)
}

fn match_normalized_url<'s>(
    snapshot: &'s CacheSnapshot,
    query: &Query,
) -> Option<&'s SummaryRecord> {
    snapshot.normalized.get(&query.normalized_url)
}

fn match_origin_title<'s>(
    snapshot: &'s CacheSnapshot,
    query: &Query,
) -> Option<&'s SummaryRecord> {
    let key = query.origin_title_key()?;
    snapshot.origin_title.get(&key)
}

// History is newest-first, so the first match is the latest write.
fn match_history_url<'s>(
    snapshot: &'s CacheSnapshot,
    query: &Query,
) -> Option<&'s SummaryRecord> {
    snapshot
        .history
        .iter()
        .find(|r| normalize_url(&r.url) == query.normalized_url)
}

// Hostless URLs that parse (`file:`) match each other on the empty host.
fn match_history_origin_title<'s>(
    snapshot: &'s CacheSnapshot,
    query: &Query,
) -> Option<&'s SummaryRecord> {
    let host = query.host.as_deref()?;
    let title = (!query.title.is_empty()).then(|| normalize_title(&query.title));

    // min_by_key keeps the first of equal keys, i.e. the earliest in history order.
    snapshot
        .history
        .iter()
        .filter(|r| host_of(&r.url).as_deref() == Some(host))
        .filter(|r| title.as_ref().map_or(true, |t| normalize_title(&r.title) == *t))
        .min_by_key(|r| Reverse(r.updated_at))
}

fn match_most_recent<'s>(
    snapshot: &'s CacheSnapshot,
    _query: &Query,
) -> Option<&'s SummaryRecord> {
    snapshot.history.iter().min_by_key(|r| Reverse(r.updated_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, title: &str, markdown: &str, updated_at: i64) -> SummaryRecord {
        SummaryRecord {
            url: url.to_string(),
            title: title.to_string(),
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            user_hint: String::new(),
            markdown: markdown.to_string(),
            updated_at,
        }
    }

    fn step_for(snapshot: &CacheSnapshot, url: &str, title: &str) -> Option<(MatchStep, String)> {
        resolve(snapshot, &Query::new(url, title)).map(|(step, r)| (step, r.markdown.clone()))
    }

    #[test]
    fn test_chain_order() {
        let steps: Vec<_> = FALLBACK_CHAIN.iter().map(|(step, _)| *step).collect();
        assert_eq!(
            steps,
            vec![
                MatchStep::ExactUrl,
                MatchStep::NormalizedUrl,
                MatchStep::OriginTitle,
                MatchStep::HistoryUrl,
                MatchStep::HistoryOriginTitle,
                MatchStep::MostRecent,
            ]
        );
    }

    #[test]
    fn test_empty_snapshot_misses() {
        let snapshot = CacheSnapshot::default();
        assert!(step_for(&snapshot, "https://a.com/p", "X").is_none());
        assert!(step_for(&snapshot, "garbage", "").is_none());
    }

    #[test]
    fn test_exact_beats_normalized() {
        let mut snapshot = CacheSnapshot::default();
        snapshot
            .exact
            .insert("https://a.com/p?x=1".into(), record("https://a.com/p?x=1", "", "exact", 1));
        snapshot
            .normalized
            .insert("https://a.com/p".into(), record("https://a.com/p", "", "norm", 2));

        assert_eq!(
            step_for(&snapshot, "https://a.com/p?x=1", ""),
            Some((MatchStep::ExactUrl, "exact".to_string()))
        );
        assert_eq!(
            step_for(&snapshot, "https://a.com/p/", ""),
            Some((MatchStep::NormalizedUrl, "norm".to_string()))
        );
    }

    #[test]
    fn test_origin_title_step() {
        let mut snapshot = CacheSnapshot::default();
        snapshot
            .origin_title
            .insert("a.com|my page".into(), record("https://a.com/old", "My Page", "ot", 1));

        assert_eq!(
            step_for(&snapshot, "https://a.com/new", "  MY PAGE "),
            Some((MatchStep::OriginTitle, "ot".to_string()))
        );
        // Unparseable URLs skip the step silently.
        assert!(match_origin_title(&snapshot, &Query::new("a.com/new", "My Page")).is_none());
    }

    #[test]
    fn test_history_url_returns_first_in_order() {
        let snapshot = CacheSnapshot {
            history: vec![
                record("https://a.com/p?utm=2", "X", "newer", 5),
                record("https://a.com/p?utm=1", "X", "older", 9),
            ],
            ..Default::default()
        };
        let hit = match_history_url(&snapshot, &Query::new("https://a.com/p", ""));
        assert_eq!(hit.map(|r| r.markdown.as_str()), Some("newer"));
    }

    #[test]
    fn test_history_origin_title_prefers_latest_then_first() {
        let snapshot = CacheSnapshot {
            history: vec![
                record("https://a.com/x", "Title", "first-tie", 7),
                record("https://a.com/y", "title", "second-tie", 7),
                record("https://a.com/z", "Title", "old", 3),
                record("https://a.com/w", "Other", "other-title", 99),
                record("https://b.com/x", "Title", "other-host", 100),
            ],
            ..Default::default()
        };

        assert_eq!(
            step_for(&snapshot, "https://a.com/q", "TITLE"),
            Some((MatchStep::HistoryOriginTitle, "first-tie".to_string()))
        );
        // Without a title any same-host entry qualifies.
        assert_eq!(
            step_for(&snapshot, "https://a.com/q", ""),
            Some((MatchStep::HistoryOriginTitle, "other-title".to_string()))
        );
    }

    #[test]
    fn test_most_recent_is_last_resort() {
        let snapshot = CacheSnapshot {
            history: vec![
                record("https://b.com/1", "B", "b1", 4),
                record("https://c.com/1", "C", "c1", 8),
            ],
            ..Default::default()
        };
        let hit = step_for(&snapshot, "https://a.com/p", "A");
        assert_eq!(hit, Some((MatchStep::MostRecent, "c1".to_string())));
        assert!(!MatchStep::MostRecent.is_same_page());
        assert!(MatchStep::HistoryUrl.is_same_page());

        // Unparseable URLs still fall through to the last resort.
        assert_eq!(
            step_for(&snapshot, "not a url", ""),
            Some((MatchStep::MostRecent, "c1".to_string()))
        );
    }

    #[test]
    fn test_hostless_urls_match_on_empty_host() {
        let snapshot = CacheSnapshot {
            history: vec![
                record("file:///notes/b.html", "Notes", "local", 2),
                record("https://b.com/1", "Notes", "remote", 9),
            ],
            ..Default::default()
        };

        assert_eq!(
            step_for(&snapshot, "file:///notes/c.html", "notes"),
            Some((MatchStep::HistoryOriginTitle, "local".to_string()))
        );
        let query = Query::new("file:///notes/c.html", "Notes");
        assert!(match_origin_title(&snapshot, &query).is_none());
    }
}
