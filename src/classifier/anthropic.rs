//! Anthropic Messages API クライアント
//!
//! 429 / 5xx は指数バックオフ（1s, 2s, ...）で再試行する。

use super::RemoteClassifier;
use crate::error::{MapperError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 512;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Anthropic API 経由の分類
#[derive(Clone)]
pub struct AnthropicClassifier {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClassifier {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// 接続先を差し替える（プロキシ・検証用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl RemoteClassifier for AnthropicClassifier {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn classify(&self, prompt: &str) -> Result<String> {
        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<MapperError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "分類API呼び出し失敗（{}回目）、{}ms後に再試行します",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(MapperError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("分類APIが {} を返しました: {}", status, body);
                last_error = Some(MapperError::ApiCall(format!("status {}: {}", status.as_u16(), body)));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(MapperError::ApiCall(format!("status {}: {}", status.as_u16(), message)));
            }

            let body: MessagesResponse = response.json().await?;
            let text = body
                .text()
                .ok_or_else(|| MapperError::ApiCall("応答にテキストがありません".into()))?;

            debug!(model = %self.model, chars = text.len(), "classification response");
            return Ok(text.to_string());
        }

        Err(last_error.unwrap_or_else(|| MapperError::ApiCall(format!("{}回再試行しても失敗しました", MAX_RETRIES))))
    }
}
