use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::Error, settings::LlmSettings};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const WARMUP_MESSAGE: &str = "Hello test";

/// A text generation service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a reply to `prompt` with `model`. The service default
    /// temperature is used when `temperature` is `None`.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String, Error>;
}

/// Client for the Cohere chat endpoint.
pub struct CohereClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl CohereClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::ModelCall(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/chat", settings.api_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for CohereClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String, Error> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model,
                message: prompt,
                temperature,
            })
            .send()
            .await
            .map_err(|e| Error::ModelCall(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::ModelCall(e.to_string()))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |e| e.message);
            return Err(Error::ModelCall(format!("status {status}: {detail}")));
        }

        let reply: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Error::ModelCall(format!("unexpected response body: {e}")))?;
        Ok(reply.text)
    }
}

/// Picks the model to use for the rest of the process.
///
/// `preferred` is sent a trivial message once; `fallback` is returned if
/// that call fails.
pub async fn select_model(llm: &dyn LanguageModel, preferred: &str, fallback: &str) -> String {
    match llm.generate(preferred, WARMUP_MESSAGE, None).await {
        Ok(_) => {
            info!("Using language model '{preferred}'");
            preferred.to_string()
        }
        Err(e) => {
            warn!("Language model '{preferred}' unavailable ({e}); falling back to '{fallback}'");
            fallback.to_string()
        }
    }
}
