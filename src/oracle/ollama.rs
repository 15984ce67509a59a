// src/oracle/ollama.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TextOracle;
use crate::utils::env::env_or;

/// Connection settings for the Ollama server behind the oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub url: String,
    pub model: String,
    pub request_timeout_secs: u64,
    /// Attempts per oracle question, counting the first one.
    pub max_attempts: usize,
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            request_timeout_secs: 120,
            max_attempts: 3,
            temperature: 0.1,
        }
    }
}

impl OracleConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("OLLAMA_URL", defaults.url)
                .trim_end_matches('/')
                .to_string(),
            model: env_or("OLLAMA_MODEL", defaults.model),
            request_timeout_secs: env_or("AI_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            max_attempts: env_or("AI_MAX_ATTEMPTS", defaults.max_attempts),
            temperature: env_or("AI_TEMPERATURE", defaults.temperature),
        }
    }

    pub fn log_config(&self) {
        info!(
            "🤖 Oracle: model '{}' at {} (timeout {}s, up to {} attempts)",
            self.model, self.url, self.request_timeout_secs, self.max_attempts
        );
    }
}

/// OLLAMA API request structure
#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

/// OLLAMA options for better control
#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

/// OLLAMA API response structure
#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

pub struct OllamaClient {
    http: Client,
    config: OracleConfig,
}

impl OllamaClient {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client for OLLAMA")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.url)
    }

    async fn generate(&self, request: &OllamaRequest<'_>) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .context("Failed to send request to OLLAMA")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("OLLAMA returned status: {}", response.status()));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse OLLAMA response")?;
        if !body.done {
            debug!("OLLAMA reported an unfinished generation");
        }
        Ok(body.response)
    }

    /// Sends a trivial prompt to check the server and model are reachable.
    pub async fn test_connection(&self) -> Result<()> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt: "Hello, this is a test. Please respond with 'Connection successful.'",
            stream: false,
            options: None,
        };
        self.generate(&request)
            .await
            .with_context(|| format!("OLLAMA is not reachable at {}", self.config.url))?;
        Ok(())
    }
}

#[async_trait]
impl TextOracle for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: Some(OllamaOptions {
                temperature: self.config.temperature,
                top_p: 0.9,
                repeat_penalty: 1.1,
            }),
        };
        let reply = self.generate(&request).await?;
        Ok(reply.trim().to_string())
    }
}
