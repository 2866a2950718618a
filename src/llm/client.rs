//! OpenAI-compatible chat client.
//!
//! Works with any endpoint speaking the chat-completions protocol, including
//! Gemini's OpenAI-compatible API.

use super::Completion;
use crate::config::LlmConfig;
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    // Some providers send `null` content when the reply is filtered.
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// API error response. Gemini wraps it in a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiError {
    Single { error: ApiErrorDetail },
    Wrapped(Vec<ApiError>),
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ApiError {
    fn message(&self) -> Option<&str> {
        match self {
            ApiError::Single { error } => Some(&error.message),
            ApiError::Wrapped(list) => list.first().and_then(ApiError::message),
        }
    }
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage (if available).
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

fn parse_completion(body: &str) -> Result<LlmResponse> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| EvalError::LlmApi("No choices in response".to_string()))?;

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: completion.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body)
        .ok()
        .as_ref()
        .and_then(ApiError::message)
    {
        Some(message) => format!("API error ({}): {}", status, message),
        None => format!("Request failed ({}): {}", status, body),
    }
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Send a chat completion request.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EvalError::LlmApi(error_message(status, &body)));
        }

        let response = parse_completion(&body)?;
        if let Some(usage) = response.usage {
            debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM call finished"
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::new();

        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(user));

        let response = self.chat(messages).await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_construction() {
        let config = LlmConfig {
            api_base: "https://api.example.com/v1/".to_string(),
            api_key: "test".to_string(),
            ..Default::default()
        };
        let client = LlmClient::new(config);
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");

        let client = LlmClient::new(LlmConfig::default());
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = ChatCompletionRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![Message::system("be terse"), Message::user("hi")],
            max_tokens: None,
            temperature: Some(0.0),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "choices": [ { "message": { "role": "assistant", "content": "{\"entities\": []}" }, "finish_reason": "stop" } ],
            "usage": { "prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14 }
        }"#;
        let response = parse_completion(body).unwrap();
        assert_eq!(response.content, "{\"entities\": []}");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 14);

        let filtered = parse_completion(r#"{ "choices": [ { "message": { "content": null } } ] }"#)
            .unwrap();
        assert_eq!(filtered.content, "");

        assert!(matches!(
            parse_completion(r#"{ "choices": [] }"#),
            Err(EvalError::LlmApi(_))
        ));
    }

    #[test]
    fn test_error_message_uses_api_detail() {
        let status = reqwest::StatusCode::UNAUTHORIZED;
        let openai = r#"{ "error": { "message": "Incorrect API key", "type": "invalid_request_error" } }"#;
        assert!(error_message(status, openai).contains("Incorrect API key"));

        let gemini = r#"[ { "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" } } ]"#;
        assert!(error_message(status, gemini).contains("API key not valid"));

        assert!(error_message(status, "gateway down").contains("gateway down"));
    }
}
