use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Chat API error: {0}")]
    ChatApi(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(String),

    #[error("No model configured for {0}")]
    MissingModel(String),

    #[error("Page cannot be summarized (only http/https pages are supported): {0}")]
    UnsupportedPage(String),

    #[error("Failed to extract page content: {0}")]
    Extract(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::MissingApiKey("deepseek".to_string());
        assert!(err.to_string().contains("deepseek"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_database() {
        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AppError::Database(_)));
    }
}
