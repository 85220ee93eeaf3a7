/// Hugging Face inference router provider
///
/// Speaks the OpenAI-compatible chat-completions API exposed by the router:
/// `POST {api_url}/{provider}/v1/chat/completions`. A single user message
/// carries the whole request; the first choice's content is the reply.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::inference::InferenceProvider,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct HuggingFaceProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    provider: String,
    model: String,
}

impl HuggingFaceProvider {
    /// Creates a provider, failing fast when the API key is missing
    pub fn new(
        api_key: String,
        api_url: String,
        provider: String,
        model: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "HuggingFace API key is not configured; set HUGGINGFACE_API_KEY".to_string(),
            ));
        }

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            provider,
            model,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.huggingface_api_key.clone(),
            config.inference_api_url.clone(),
            config.inference_provider.clone(),
            config.inference_model.clone(),
            Duration::from_secs(config.inference_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/v1/chat/completions", self.api_url, self.provider)
    }

    /// Pulls the reply text out of a chat-completion response body
    fn extract_content(response: ChatCompletionResponse) -> AppResult<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                AppError::ExternalApi(
                    "Inference service returned an empty or invalid response".to_string(),
                )
            })
    }
}

#[async_trait::async_trait]
impl InferenceProvider for HuggingFaceProvider {
    async fn infer(&self, request_text: &str) -> AppResult<String> {
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: request_text,
            }],
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Inference API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        tracing::debug!(response = %response_text, "Raw inference API response");

        let completion: ChatCompletionResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                AppError::ExternalApi(format!("Failed to parse inference response: {}", e))
            })?;

        let content = Self::extract_content(completion)?;

        tracing::info!(
            model = %self.model,
            provider = self.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            reply_len = content.len(),
            "Inference completed"
        );

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
