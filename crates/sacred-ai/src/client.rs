use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("sacred-greeks/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Completion contained no text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// A chat-completion provider. Returns the text of the first choice.
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, CompletionError>>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct HttpCompletionClient {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(url: String, api_key: String) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url,
            api_key,
        })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        debug!("Requesting completion from {} (model {})", self.url, request.model);

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(status.as_u16(), body));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        first_choice_text(body)
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, CompletionError>> {
        Box::pin(self.send(request))
    }
}

fn first_choice_text(body: ChatCompletionResponse) -> Result<String, CompletionError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_as_chat_completion() {
        let request = CompletionRequest {
            model: "test-model".into(),
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hello")],
            temperature: 0.5,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello");
        assert_eq!(value["temperature"], 0.5);
    }

    #[test]
    fn first_choice_is_extracted() {
        let body: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}},{"message":{"content":"second"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blank_or_missing_choice_is_empty_response() {
        let none: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_choice_text(none), Err(CompletionError::EmptyResponse)));

        let blank: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert!(matches!(first_choice_text(blank), Err(CompletionError::EmptyResponse)));
    }
}
