use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{CompletionRequest, LanguageModel, LlmError};
use crate::config::LlmConfig;

const MAX_ATTEMPTS: usize = 4;
const ERROR_BODY_LIMIT: usize = 200;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    backoff: Duration,
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            backoff: Duration::from_millis(500),
        })
    }

    /// Base delay for the exponential retry schedule.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn payload(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.user }));
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
        })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let payload = self.payload(request);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .http
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(err.into());
                    }
                    warn!(attempt, error = %err, "language model request failed; retrying");
                    sleep(self.backoff_delay(attempt, None)).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt >= MAX_ATTEMPTS {
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(LlmError::RateLimited { attempts: attempt });
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(LlmError::Status {
                        status: status.as_u16(),
                        body: snippet(&body),
                    });
                }
                let wait = self.backoff_delay(attempt, response.headers().get("retry-after"));
                warn!(
                    attempt,
                    status = status.as_u16(),
                    wait_ms = wait.as_millis() as u64,
                    "language model unavailable; backing off"
                );
                sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "(unreadable)".to_string());
                return Err(LlmError::Status {
                    status: status.as_u16(),
                    body: snippet(&body),
                });
            }

            let body: ChatResponse = response
                .json()
                .await
                .map_err(|err| LlmError::Decode(err.to_string()))?;
            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
                .ok_or(LlmError::EmptyReply)?;
            debug!(attempt, chars = content.len(), "language model replied");
            return Ok(content);
        }
    }

    fn backoff_delay(&self, attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
        if let Some(secs) = retry_after
            .and_then(|value| value.to_str().ok())
            .and_then(|text| text.trim().parse::<u64>().ok())
        {
            return Duration::from_secs(secs.clamp(1, 30));
        }
        let exponent = attempt.saturating_sub(1).min(5) as u32;
        self.backoff * 2u32.pow(exponent)
    }
}

impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.send(request).await
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatCompletionsClient {
        ChatCompletionsClient::new(&LlmConfig::default())
            .expect("client builds")
            .with_backoff(Duration::from_millis(100))
    }

    #[test]
    fn backoff_doubles_and_honours_retry_after() {
        let client = client();
        assert_eq!(client.backoff_delay(1, None), Duration::from_millis(100));
        assert_eq!(client.backoff_delay(3, None), Duration::from_millis(400));
        let header = HeaderValue::from_static("7");
        assert_eq!(client.backoff_delay(1, Some(&header)), Duration::from_secs(7));
    }

    #[test]
    fn payload_uses_defaults_unless_overridden() {
        let client = client();
        let payload = client.payload(
            &CompletionRequest::new("hello")
                .with_system("be terse")
                .with_max_tokens(64),
        );
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["max_tokens"], 64);
        assert_eq!(payload["model"], client.model());
    }
}
