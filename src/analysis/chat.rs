//! OpenAI-compatible chat completions analyzer

use crate::analysis::{parse_analysis_response, PageAnalysis, PageAnalyzer};
use crate::config::AnalyzerConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SUMMARY_PROMPT: &str = "Analyze the webpage content and provide a JSON object with \
'summary' (brief page summary) and 'keywords' (5-10 relevant terms) fields.";

/// Errors from one chat completions call
///
/// Never leaves the analyzer: [`PageAnalyzer::analyze`] logs it and degrades
/// to an empty analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analyzer returned HTTP {0}")]
    Status(u16),

    #[error("analyzer reply has no content")]
    EmptyReply,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Analyzer backed by a `POST {endpoint}/chat/completions` API
#[derive(Debug, Clone)]
pub struct ChatAnalyzer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatAnalyzer {
    /// Creates an analyzer for the configured endpoint and model
    pub fn new(config: &AnalyzerConfig, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    /// Reads the API key from the environment variable named in the config
    pub fn from_env(config: &AnalyzerConfig) -> Option<Result<Self, reqwest::Error>> {
        let api_key = std::env::var(&config.api_key_env).ok()?;
        Some(Self::new(config, api_key))
    }

    fn system_prompt(question: Option<&str>) -> String {
        let prompt = match question {
            Some(question) => format!(
                "Analyze the webpage content and answer this question: \"{}\". \
                 Answer only from the supplied text; if the text does not contain the answer, \
                 the answer must be null. Provide response as JSON with fields: \
                 'summary' (brief page summary), 'keywords' (5-10 relevant terms), \
                 'answer' (direct answer to the question as a string, or null if no relevant answer found).",
                question
            ),
            None => SUMMARY_PROMPT.to_string(),
        };
        format!("{} Return raw JSON without markdown formatting.", prompt)
    }

    async fn complete(&self, text: &str, question: Option<&str>) -> Result<String, AnalyzerError> {
        let system = Self::system_prompt(question);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AnalyzerError::EmptyReply)
    }
}

#[async_trait]
impl PageAnalyzer for ChatAnalyzer {
    async fn analyze(&self, text: &str, question: Option<&str>) -> PageAnalysis {
        match self.complete(text, question).await {
            Ok(reply) => parse_analysis_response(&reply),
            Err(e) => {
                tracing::warn!("Page analysis failed: {}", e);
                PageAnalysis::default()
            }
        }
    }
}
