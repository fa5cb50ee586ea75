//! Language oracle abstraction
//!
//! The chain never talks to a model API directly; it sends a free-text
//! prompt through [`LanguageOracle`] and gets free-text back. Nothing about
//! the response format is guaranteed — it may be wrapped in prose or
//! markdown fences, or be empty — so all parsing tolerance lives on the
//! caller side (see `classify::payload`).

pub mod providers;

pub use providers::{MultiProviderOracle, OracleProvider, ProviderConfig};

use anyhow::Result;
use async_trait::async_trait;

/// Free-text prompt in, free-text response out.
#[async_trait]
pub trait LanguageOracle: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String>;
}
