use super::interfaces::*;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible Chat Completions provider
pub struct OpenAICompatProvider {
    client: Client,
    config: LlmConfig,
    endpoint: String,
}

impl OpenAICompatProvider {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": messages,
        })
    }
}

#[async_trait]
impl ChatClient for OpenAICompatProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let body = self.request_body(&messages);
        debug!(endpoint = %self.endpoint, messages = messages.len(), "Sending chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Transport(format!("LLM API error: {} - {}", status, text)));
        }

        let data: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            Error::ResponseFormat(format!("LLM API returned non-JSON body: {}", e))
        })?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::ResponseFormat(format!("Unexpected response format: {}", data))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            base_url: format!("{}/", server.uri()),
            api_key: "sk-test".to_string(),
            model: "gpt-test".to_string(),
            timeout_seconds: 5,
            temperature: 0.2,
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let provider = OpenAICompatProvider::new(LlmConfig {
            base_url: "https://llm.example.com/".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            timeout_seconds: 5,
            temperature: 0.0,
        })
        .unwrap();
        assert_eq!(provider.endpoint(), "https://llm.example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_chat_extracts_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "messages": [{"role": "system", "content": "You are the Impact Agent."}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"summary\":\"ok\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let text = provider
            .chat(vec![ChatMessage::system("You are the Impact Agent.")])
            .await
            .unwrap();

        assert_eq!(text, "{\"summary\":\"ok\"}");
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let err = provider.chat(vec![ChatMessage::user("hi")]).await.unwrap_err();

        match err {
            Error::Transport(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_response_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let provider = OpenAICompatProvider::new(config_for(&server)).unwrap();
        let err = provider.chat(vec![ChatMessage::user("hi")]).await.unwrap_err();

        assert!(matches!(err, Error::ResponseFormat(_)));
    }
}
