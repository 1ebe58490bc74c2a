use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Provider;

const SYSTEM_PROMPT: &str = "You are a summarization assistant. Always answer in Markdown.";
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Language::En,
            _ => Language::Zh,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Language::Zh => {
                "请用 Markdown 输出中文摘要，使用合适的标题、列表、\
                 分段与强调，简洁准确，勿添加额外装饰。"
            }
            Language::En => {
                "Please output the summary in Markdown with headings, lists and clear sections."
            }
        }
    }
}

/// Page text plus the context the model sees alongside it.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub content: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub user_hint: &'a str,
    pub language: Language,
}

pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let hint = input.user_hint.trim();
    let extra = if hint.is_empty() {
        String::new()
    } else {
        format!("\nAdditional requirements: {hint}")
    };

    format!(
        "Summarize the following web page.\n\nTitle: {}\nURL: {}\n\nContent:\n{}\n\n{}{}",
        input.title,
        input.url,
        input.content,
        input.language.instruction(),
        extra
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct Summarizer {
    client: Client,
    provider: Provider,
    api_key: String,
    model: String,
    endpoint: String,
}

impl Summarizer {
    pub fn new(provider: Provider, api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::MissingApiKey(provider.to_string()));
        }
        if model.trim().is_empty() {
            return Err(AppError::MissingModel(provider.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            provider,
            api_key,
            model,
            endpoint: provider.endpoint(),
        })
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` and returns the trimmed Markdown answer.
    pub async fn generate_summary(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
        };

        tracing::debug!("POST {} (model {})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(AppError::ChatApi(format!("request failed {}: {}", status, error_text)));
        }

        let chat_response: ChatResponse = response.json().await?;
        extract_content(chat_response)
    }
}

fn extract_content(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AppError::ChatApi("model returned no content".to_string()));
    }
    Ok(content)
}
