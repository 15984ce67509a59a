// src/oracle/mod.rs
//! External text-completion service used to arbitrate between registry
//! candidates that deterministic matching could not separate.

use anyhow::Result;
use async_trait::async_trait;

pub mod adapter;
pub mod ollama;
pub mod prompts;
pub mod rate_limiter;

pub use adapter::{OracleAdapter, OracleVerdict};
pub use ollama::{OllamaClient, OracleConfig};
pub use rate_limiter::RateLimiter;

/// One prompt in, one free-text reply out.
#[async_trait]
pub trait TextOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
