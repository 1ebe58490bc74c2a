use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One cached summarization result. Never mutated after creation; a
/// regeneration produces a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub user_hint: String,
    #[serde(default)]
    pub markdown: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub updated_at: i64,
}

impl SummaryRecord {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        user_hint: impl Into<String>,
        markdown: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            provider: provider.into(),
            model: model.into(),
            user_hint: user_hint.into(),
            markdown: markdown.into(),
            updated_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.updated_at).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let record = SummaryRecord {
            url: "https://a.com/p".to_string(),
            title: "X".to_string(),
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            user_hint: "short".to_string(),
            markdown: "# X".to_string(),
            updated_at: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userHint"], "short");
        assert_eq!(value["updatedAt"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_missing_fields_default() {
        let record: SummaryRecord =
            serde_json::from_str(r#"{"url":"https://a.com","markdown":"m"}"#).unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.user_hint, "");
        assert_eq!(record.updated_at, 0);
    }

    #[test]
    fn test_new_stamps_time() {
        let record = SummaryRecord::new("https://a.com", "", "qwen", "m", "", "body");
        assert!(record.updated_at > 0);
        assert!(record.updated_at_utc().is_some());
    }
}
