//! Provider clients for hosted LLM APIs.

pub mod anthropic;
pub mod google;
pub mod http;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::llm::json::parse_json_response;
use crate::llm::registry::ProviderFamily;
use crate::llm::schema::Schema;

/// Inputs a factory needs to build a client.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    /// Overrides the provider's default API root (no trailing slash).
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// One generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

/// Schema-validated structured generation.
#[derive(Debug, Clone)]
pub struct ObjectGeneration {
    pub value: Value,
    pub usage: Option<Usage>,
}

/// Free-text generation.
#[derive(Debug, Clone)]
pub struct TextGeneration {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Client for a single provider family.
///
/// This abstraction allows mocking the provider API in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Generate a value constrained to `schema`. The returned value has been
    /// validated against it.
    async fn generate_object(
        &self,
        request: &GenerateRequest,
        schema: &Schema,
    ) -> Result<ObjectGeneration, ProviderError>;

    /// Generate free text with no output constraint.
    async fn generate_text(&self, request: &GenerateRequest)
    -> Result<TextGeneration, ProviderError>;
}

/// Parse and validate the JSON text a provider returned in structured mode.
pub(crate) fn decode_structured(
    provider: ProviderFamily,
    text: &str,
    schema: &Schema,
) -> Result<Value, ProviderError> {
    let value = parse_json_response(text).map_err(|e| ProviderError::InvalidJson {
        provider,
        message: format!("{}. Content: {}", e, text),
    })?;
    check_schema(provider, value, schema)
}

pub(crate) fn check_schema(
    provider: ProviderFamily,
    value: Value,
    schema: &Schema,
) -> Result<Value, ProviderError> {
    schema
        .validate(&value)
        .map_err(|message| ProviderError::SchemaMismatch { provider, message })?;
    Ok(value)
}
