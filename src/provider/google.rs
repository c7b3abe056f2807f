//! Google Gemini `generateContent` client.
//!
//! Gemini accepts only an OpenAPI-style subset of JSON Schema for
//! `responseSchema`, so schemas are converted with [`to_gemini_schema`] before
//! being sent. Validation of the reply still uses the original schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::llm::registry::ProviderFamily;
use crate::llm::schema::Schema;

use super::http::{build_client, post_json};
use super::{
    GenerateRequest, ObjectGeneration, ProviderClient, ProviderSettings, TextGeneration, Usage,
    decode_structured,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: ProviderFamily = ProviderFamily::Google;

/// Keywords Gemini understands; everything else is dropped.
const SUPPORTED_KEYWORDS: &[&str] = &[
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "items",
    "properties",
    "required",
    "minItems",
    "maxItems",
    "minimum",
    "maximum",
    "anyOf",
];

/// Formats Gemini accepts per type.
const SUPPORTED_FORMATS: &[&str] = &["enum", "date-time", "int32", "int64", "float", "double"];

/// Guards against self-referential `$ref` chains.
const MAX_REF_DEPTH: usize = 16;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

impl From<UsageMetadata> for Usage {
    fn from(usage: UsageMetadata) -> Self {
        Usage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }
    }
}

fn build_request<'a>(
    request: &'a GenerateRequest,
    generation_config: Option<GenerationConfig>,
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        system_instruction: request
            .system_prompt
            .as_deref()
            .map(|text| SystemInstruction {
                parts: vec![Part { text }],
            }),
        generation_config,
    }
}

/// Answer text of the first candidate, skipping thought parts.
fn candidate_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

/// Convert a JSON Schema document into Gemini's schema dialect.
///
/// Local `$ref`s into `definitions`/`$defs` are inlined, `["T", "null"]`
/// type arrays become `nullable`, and unsupported keywords are removed.
pub fn to_gemini_schema(document: &Value) -> Value {
    convert(document, document, 0)
}

fn convert(node: &Value, root: &Value, depth: usize) -> Value {
    let Some(object) = node.as_object() else {
        return node.clone();
    };

    if let Some(target) = object.get("$ref").and_then(Value::as_str) {
        if depth < MAX_REF_DEPTH
            && let Some(resolved) = resolve_ref(root, target)
        {
            return convert(resolved, root, depth + 1);
        }
        return Value::Object(Map::new());
    }

    let mut out = Map::new();
    for (key, value) in object {
        if !SUPPORTED_KEYWORDS.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "type" => apply_type(value, &mut out),
            "format" => {
                if value.as_str().is_some_and(|f| SUPPORTED_FORMATS.contains(&f)) {
                    out.insert(key.clone(), value.clone());
                }
            }
            "properties" => {
                let properties = value
                    .as_object()
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, schema)| (name.clone(), convert(schema, root, depth)))
                            .collect::<Map<_, _>>()
                    })
                    .unwrap_or_default();
                out.insert(key.clone(), Value::Object(properties));
            }
            "items" => {
                out.insert(key.clone(), convert(value, root, depth));
            }
            "anyOf" => apply_any_of(value, root, depth, &mut out),
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn apply_type(value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::Array(types) => {
            let non_null: Vec<&Value> = types.iter().filter(|t| t.as_str() != Some("null")).collect();
            if non_null.len() < types.len() {
                out.insert("nullable".to_string(), Value::Bool(true));
            }
            if let Some(first) = non_null.first() {
                out.insert("type".to_string(), (*first).clone());
            }
        }
        other => {
            out.insert("type".to_string(), other.clone());
        }
    }
}

/// Convert `anyOf`, turning a `{"type": "null"}` variant into `nullable`.
///
/// A single remaining variant is merged into the parent, which is how an
/// optional `$ref` ends up looking after `$ref` inlining.
fn apply_any_of(value: &Value, root: &Value, depth: usize, out: &mut Map<String, Value>) {
    let converted: Vec<Value> = value
        .as_array()
        .map(|items| items.iter().map(|v| convert(v, root, depth)).collect())
        .unwrap_or_default();
    let total = converted.len();
    let mut variants: Vec<Value> = converted
        .into_iter()
        .filter(|variant| variant.get("type").and_then(Value::as_str) != Some("null"))
        .collect();

    if variants.len() < total {
        out.insert("nullable".to_string(), Value::Bool(true));
    }

    match variants.pop() {
        Some(Value::Object(only)) if variants.is_empty() => {
            for (key, value) in only {
                out.entry(key).or_insert(value);
            }
        }
        Some(last) => {
            variants.push(last);
            out.insert("anyOf".to_string(), Value::Array(variants));
        }
        None => {}
    }
}

fn resolve_ref<'a>(root: &'a Value, target: &str) -> Option<&'a Value> {
    let pointer = target.strip_prefix('#')?;
    root.pointer(pointer)
}

/// Client for Gemini models.
pub struct GoogleClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(settings)?,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
        })
    }

    async fn send(
        &self,
        model: &str,
        payload: &GenerateContentRequest<'_>,
    ) -> Result<(String, Option<Usage>), ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let headers = [("x-goog-api-key", self.api_key.as_str())];

        let mut response: GenerateContentResponse =
            post_json(PROVIDER, &self.client, &url, &headers, payload).await?;
        let usage = response.usage_metadata.take().map(Usage::from);
        let text = candidate_text(response).ok_or(ProviderError::EmptyResponse(PROVIDER))?;
        Ok((text, usage))
    }
}

/// Factory used by the model registry.
pub fn create_client(settings: &ProviderSettings) -> Result<Box<dyn ProviderClient>, ProviderError> {
    Ok(Box::new(GoogleClient::new(settings)?))
}

#[async_trait]
impl ProviderClient for GoogleClient {
    async fn generate_object(
        &self,
        request: &GenerateRequest,
        schema: &Schema,
    ) -> Result<ObjectGeneration, ProviderError> {
        let config = GenerationConfig {
            response_mime_type: "application/json",
            response_schema: to_gemini_schema(schema.document()),
        };
        let payload = build_request(request, Some(config));

        let (text, usage) = self.send(&request.model, &payload).await?;
        let value = decode_structured(PROVIDER, &text, schema)?;
        Ok(ObjectGeneration { value, usage })
    }

    async fn generate_text(
        &self,
        request: &GenerateRequest,
    ) -> Result<TextGeneration, ProviderError> {
        let payload = build_request(request, None);
        let (text, usage) = self.send(&request.model, &payload).await?;
        Ok(TextGeneration { text, usage })
    }
}
