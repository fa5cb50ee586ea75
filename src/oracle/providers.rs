//! Multi-provider oracle support
//!
//! Supports Anthropic (Claude), OpenAI, and Google Gemini APIs with
//! rate limiting and automatic failover between configured providers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::LanguageOracle;

/// Supported oracle providers.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleProvider {
    Anthropic,
    OpenAI,
    Gemini,
}

/// Configuration for one oracle provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: OracleProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// Oracle client with ordered failover across configured providers.
pub struct MultiProviderOracle {
    client: Client,
    providers: Vec<ProviderConfig>,
    rate_limiter: Arc<Semaphore>,
}

/// The shared HTTP client must outlast the slowest configured provider.
fn request_timeout(providers: &[ProviderConfig]) -> Duration {
    let seconds = providers
        .iter()
        .map(|config| config.timeout_seconds)
        .max()
        .unwrap_or(60);
    Duration::from_secs(seconds)
}

impl MultiProviderOracle {
    /// Create a new multi-provider oracle client.
    pub fn new(providers: Vec<ProviderConfig>, max_concurrent: usize) -> Result<Self> {
        if providers.is_empty() {
            return Err(anyhow!("At least one provider must be configured"));
        }

        let client = Client::builder()
            .timeout(request_timeout(&providers))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            providers,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    /// Create from environment variables.
    ///
    /// Checks `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, and `GEMINI_API_KEY`,
    /// registering a provider for each key found, in that order.
    pub fn from_env() -> Result<Self> {
        let mut providers = Vec::new();

        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            providers.push(ProviderConfig {
                provider: OracleProvider::Anthropic,
                api_key,
                model: std::env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
                base_url: "https://api.anthropic.com/v1".to_string(),
                max_tokens: 1024,
                temperature: 0.1,
                timeout_seconds: 30,
            });
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            providers.push(ProviderConfig {
                provider: OracleProvider::OpenAI,
                api_key,
                model: std::env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| "gpt-4-turbo-preview".to_string()),
                base_url: "https://api.openai.com/v1".to_string(),
                max_tokens: 1024,
                temperature: 0.1,
                timeout_seconds: 30,
            });
        }

        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            providers.push(ProviderConfig {
                provider: OracleProvider::Gemini,
                api_key,
                model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-pro".to_string()),
                base_url: "https://generativelanguage.googleapis.com/v1".to_string(),
                max_tokens: 1024,
                temperature: 0.1,
                timeout_seconds: 30,
            });
        }

        Self::new(providers, 5)
    }

    /// Send a prompt with automatic failover across providers.
    pub async fn query(&self, prompt: &str) -> Result<String> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|_| anyhow!("Failed to acquire rate limit permit"))?;

        let mut last_error = None;

        for config in &self.providers {
            match self.call_provider(config, prompt).await {
                Ok(content) => {
                    info!("Oracle request successful via {:?}", config.provider);
                    return Ok(content);
                }
                Err(e) => {
                    warn!("Provider {:?} failed: {}", config.provider, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All providers failed")))
    }

    async fn call_provider(&self, config: &ProviderConfig, prompt: &str) -> Result<String> {
        match config.provider {
            OracleProvider::Anthropic => self.call_anthropic(config, prompt).await,
            OracleProvider::OpenAI => self.call_openai(config, prompt).await,
            OracleProvider::Gemini => self.call_gemini(config, prompt).await,
        }
    }

    /// Call Anthropic API
    async fn call_anthropic(&self, config: &ProviderConfig, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            messages: Vec<AnthropicMessage>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            text: String,
        }

        let request = AnthropicRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!("Calling Anthropic API with model: {}", config.model);

        let response = self
            .client
            .post(format!("{}/messages", config.base_url))
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send Anthropic request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API error: {}", error_text));
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        Ok(result
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default())
    }

    /// Call OpenAI API
    async fn call_openai(&self, config: &ProviderConfig, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct OpenAiRequest {
            model: String,
            messages: Vec<OpenAiMessage>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Serialize, Deserialize)]
        struct OpenAiMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct OpenAiResponse {
            choices: Vec<OpenAiChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAiChoice {
            message: OpenAiMessage,
        }

        let request = OpenAiRequest {
            model: config.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        debug!("Calling OpenAI API with model: {}", config.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", config.base_url))
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send OpenAI request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error: {}", error_text));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI response contained no choices"))
    }

    /// Call Gemini API
    async fn call_gemini(&self, config: &ProviderConfig, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct GeminiRequest {
            contents: Vec<GeminiContent>,
            #[serde(rename = "generationConfig")]
            generation_config: GeminiGenerationConfig,
        }

        #[derive(Serialize)]
        struct GeminiContent {
            parts: Vec<GeminiPart>,
        }

        #[derive(Serialize, Deserialize)]
        struct GeminiPart {
            text: String,
        }

        #[derive(Serialize)]
        struct GeminiGenerationConfig {
            temperature: f32,
            #[serde(rename = "maxOutputTokens")]
            max_output_tokens: u32,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            candidates: Vec<GeminiCandidate>,
        }

        #[derive(Deserialize)]
        struct GeminiCandidate {
            content: GeminiResponseContent,
        }

        #[derive(Deserialize)]
        struct GeminiResponseContent {
            parts: Vec<GeminiPart>,
        }

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
        };

        debug!("Calling Gemini API with model: {}", config.model);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            config.base_url, config.model, config.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send Gemini request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error: {}", error_text));
        }

        let result: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        result
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| anyhow!("Gemini response contained no candidates"))
    }
}

#[async_trait]
impl LanguageOracle for MultiProviderOracle {
    async fn ask(&self, prompt: &str) -> Result<String> {
        self.query(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_provider_list_is_rejected() {
        let result = MultiProviderOracle::new(vec![], 5);
        assert!(result.is_err());
    }

    fn config(provider: OracleProvider, timeout_seconds: u64) -> ProviderConfig {
        ProviderConfig {
            provider,
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            base_url: "https://example.invalid/v1".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
            timeout_seconds,
        }
    }

    #[test]
    fn client_timeout_uses_slowest_provider() {
        let providers = vec![
            config(OracleProvider::Anthropic, 30),
            config(OracleProvider::OpenAI, 90),
            config(OracleProvider::Gemini, 45),
        ];
        assert_eq!(request_timeout(&providers), Duration::from_secs(90));
    }

    #[test]
    fn single_provider_constructs_a_client() {
        let oracle = MultiProviderOracle::new(vec![config(OracleProvider::OpenAI, 30)], 5);
        assert!(oracle.is_ok());
    }
}
