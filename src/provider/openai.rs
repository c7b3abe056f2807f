//! OpenAI Chat Completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::llm::registry::ProviderFamily;
use crate::llm::schema::Schema;

use super::http::{build_client, post_json};
use super::{
    GenerateRequest, ObjectGeneration, ProviderClient, ProviderSettings, TextGeneration, Usage,
    decode_structured,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SCHEMA_NAME: &str = "response";

const PROVIDER: ProviderFamily = ProviderFamily::OpenAi;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl From<UsagePayload> for Usage {
    fn from(usage: UsagePayload) -> Self {
        Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

fn build_messages(request: &GenerateRequest) -> Vec<ChatMessage<'_>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system_prompt.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });
    messages
}

fn response_format(schema: &Schema) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "strict": false,
            "schema": schema.document(),
        }
    })
}

/// Client for GPT and o-series models.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(settings)?,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
        })
    }

    /// Send a completion request and return the message content with usage.
    async fn complete(
        &self,
        payload: &ChatCompletionRequest<'_>,
    ) -> Result<(String, Option<Usage>), ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let bearer = format!("Bearer {}", self.api_key);
        let headers = [("Authorization", bearer.as_str())];

        let body: ChatCompletionResponse =
            post_json(PROVIDER, &self.client, &url, &headers, payload).await?;
        let usage = body.usage.map(Usage::from);

        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ProviderError::EmptyResponse(PROVIDER))?;

        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(ProviderError::Refused {
                provider: PROVIDER,
                message: refusal,
            });
        }

        let content = message
            .content
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyResponse(PROVIDER))?;

        Ok((content, usage))
    }
}

/// Factory used by the model registry.
pub fn create_client(settings: &ProviderSettings) -> Result<Box<dyn ProviderClient>, ProviderError> {
    Ok(Box::new(OpenAiClient::new(settings)?))
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn generate_object(
        &self,
        request: &GenerateRequest,
        schema: &Schema,
    ) -> Result<ObjectGeneration, ProviderError> {
        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: build_messages(request),
            response_format: Some(response_format(schema)),
        };

        let (content, usage) = self.complete(&payload).await?;
        let value = decode_structured(PROVIDER, &content, schema)?;
        Ok(ObjectGeneration { value, usage })
    }

    async fn generate_text(
        &self,
        request: &GenerateRequest,
    ) -> Result<TextGeneration, ProviderError> {
        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: build_messages(request),
            response_format: None,
        };

        let (text, usage) = self.complete(&payload).await?;
        Ok(TextGeneration { text, usage })
    }
}
