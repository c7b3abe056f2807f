//! Anthropic Messages API client.
//!
//! Structured output is produced by forcing a single tool call whose input
//! schema is the requested schema; the tool input is the result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::llm::registry::ProviderFamily;
use crate::llm::schema::Schema;

use super::http::{build_client, post_json};
use super::{
    GenerateRequest, ObjectGeneration, ProviderClient, ProviderSettings, TextGeneration, Usage,
    check_schema,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const TOOL_NAME: &str = "json";

const PROVIDER: ProviderFamily = ProviderFamily::Anthropic;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl From<UsagePayload> for Usage {
    fn from(usage: UsagePayload) -> Self {
        let total_tokens = match (usage.input_tokens, usage.output_tokens) {
            (Some(input), Some(output)) => input.checked_add(output),
            _ => None,
        };
        Usage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens,
        }
    }
}

/// Client for Claude models.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(settings)?,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
        })
    }

    async fn send(&self, payload: &MessagesRequest<'_>) -> Result<MessagesResponse, ProviderError> {
        let url = format!("{}/messages", self.base_url);
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", API_VERSION),
        ];
        post_json(PROVIDER, &self.client, &url, &headers, payload).await
    }
}

/// Factory used by the model registry.
pub fn create_client(settings: &ProviderSettings) -> Result<Box<dyn ProviderClient>, ProviderError> {
    Ok(Box::new(AnthropicClient::new(settings)?))
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn generate_object(
        &self,
        request: &GenerateRequest,
        schema: &Schema,
    ) -> Result<ObjectGeneration, ProviderError> {
        let payload = MessagesRequest {
            model: &request.model,
            max_tokens: MAX_TOKENS,
            system: request.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            tools: vec![Tool {
                name: TOOL_NAME,
                description: "Respond with a JSON object.",
                input_schema: schema.document(),
            }],
            tool_choice: Some(ToolChoice {
                kind: "tool",
                name: TOOL_NAME,
            }),
        };

        let response = self.send(&payload).await?;
        let usage = response.usage.map(Usage::from);

        let input = response
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { name, input } if name == TOOL_NAME => Some(input),
                _ => None,
            })
            .ok_or(ProviderError::EmptyResponse(PROVIDER))?;

        let value = check_schema(PROVIDER, input, schema)?;
        Ok(ObjectGeneration { value, usage })
    }

    async fn generate_text(
        &self,
        request: &GenerateRequest,
    ) -> Result<TextGeneration, ProviderError> {
        let payload = MessagesRequest {
            model: &request.model,
            max_tokens: MAX_TOKENS,
            system: request.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            tools: Vec::new(),
            tool_choice: None,
        };

        let response = self.send(&payload).await?;
        let usage = response.usage.map(Usage::from);

        let text: String = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(PROVIDER));
        }

        Ok(TextGeneration { text, usage })
    }
}
