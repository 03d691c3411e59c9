//! OpenAI chat-completions summarizer.

use std::time::Duration;

use allocbook::RebalanceReport;
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;
use crate::error::{Error, Result};
use crate::explain::{Summarizer, build_prompt};

const SYSTEM_PROMPT: &str = "You are a helpful financial assistant.";

/// Blocking client for POST /v1/chat/completions.
pub struct OpenAiSummarizer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiSummarizer {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Summarizer(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }

    /// Build from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Summarizer(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Self::new(
            &api_key,
            &config.base_url,
            &config.model,
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn request_body(&self, prompt: String) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
        }
    }
}

impl Summarizer for OpenAiSummarizer {
    fn summarize(&self, report: &RebalanceReport, request: &str) -> Result<String> {
        let prompt = build_prompt(report, request)?;
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("POST {url} (model {})", self.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| Error::Summarizer(format!("chat request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(Error::Summarizer(format!(
                "chat completions returned {status}: {body}"
            )));
        }

        let body = resp
            .json::<ChatResponse>()
            .map_err(|e| Error::Summarizer(format!("failed to parse chat response: {e}")))?;
        first_message(body)
    }
}

/// Trimmed content of the first choice.
pub fn first_message(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| Error::Summarizer("chat response had no content".into()))
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
}
