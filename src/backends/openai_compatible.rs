use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BackendError, BackendResult, LlmBackend, LlmResponse, MAX_REPLY_TOKENS, TEMPERATURE};
use crate::conversations::{ConversationMessage, Role};

#[derive(Debug, Clone)]
pub struct OpenAICompatibleConfig {
    pub name: String,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            api_key: String::new(),
            model: "gpt-4-1106-preview".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

pub struct OpenAICompatibleBackend {
    client: reqwest::Client,
    config: OpenAICompatibleConfig,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    messages: &'a [ConversationMessage],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAICompatibleBackend {
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        let mut client_builder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30));

        if let Ok(http_proxy) = std::env::var("HTTP_PROXY") {
            if let Ok(proxy) = reqwest::Proxy::http(&http_proxy) {
                client_builder = client_builder.proxy(proxy);
            }
        }

        if let Ok(https_proxy) = std::env::var("HTTPS_PROXY") {
            if let Ok(proxy) = reqwest::Proxy::https(&https_proxy) {
                client_builder = client_builder.proxy(proxy);
            }
        }

        let client = client_builder
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn check_api_key(&self) -> BackendResult<()> {
        if self.config.api_key.is_empty() {
            return Err(BackendError::Authentication(format!(
                "{} API key not configured. Set it with: goftar config set {}.api_key <your_key>",
                self.config.name, self.config.name
            )));
        }
        Ok(())
    }

    fn http_error_to_backend_error(status: reqwest::StatusCode, error_text: String) -> BackendError {
        let status_code = status.as_u16();

        match status_code {
            429 => BackendError::RateLimit {
                retry_after: None,
                message: error_text,
            },
            500..=599 => BackendError::ServerError {
                status: status_code,
                message: error_text,
            },
            401 | 403 => BackendError::Authentication(error_text),
            _ => BackendError::InvalidResponse(format!(
                "API error {}: {}",
                status_code, error_text
            )),
        }
    }

    async fn chat_completion(
        &self,
        messages: &[ConversationMessage],
        json_mode: bool,
    ) -> BackendResult<ChatCompletionResponse> {
        self.check_api_key()?;

        let request = ChatCompletionRequest {
            model: &self.config.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_REPLY_TOKENS,
            response_format: json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
            messages,
        };
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let error_text = response.text().await.unwrap_or_default();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = headers
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                return Err(BackendError::RateLimit {
                    retry_after,
                    message: error_text,
                });
            }

            return Err(Self::http_error_to_backend_error(status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    fn extract_reply(&self, response: ChatCompletionResponse) -> BackendResult<LlmResponse> {
        let total_tokens = response.usage.total_tokens;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| LlmResponse {
                content,
                total_tokens,
            })
            .ok_or_else(|| {
                BackendError::InvalidResponse(format!("No reply from {}", self.config.name))
            })
    }
}

#[async_trait]
impl LlmBackend for OpenAICompatibleBackend {
    async fn converse(
        &self,
        messages: &[ConversationMessage],
        json_mode: bool,
    ) -> BackendResult<LlmResponse> {
        let response = self.chat_completion(messages, json_mode).await?;
        self.extract_reply(response)
    }

    async fn one_shot(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
    ) -> BackendResult<String> {
        let messages = [
            ConversationMessage::new(Role::System, system_prompt),
            ConversationMessage::new(Role::User, user_prompt),
        ];
        let response = self.chat_completion(&messages, json_mode).await?;
        Ok(self.extract_reply(response)?.content)
    }

    fn backend_name(&self) -> &str {
        &self.config.name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
