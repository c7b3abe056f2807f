//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use prompt_runner::{Config, Schema};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const THINKING_MODEL: &str = "gemini-2.0-flash-thinking-exp-01-21";

/// Schema for `{ "x": number }`.
pub fn x_schema() -> Schema {
    Schema::new(json!({
        "type": "object",
        "properties": { "x": { "type": "number" } },
        "required": ["x"]
    }))
    .expect("valid schema")
}

/// Config for `model` pointed at the mock server.
pub fn mock_config(server: &MockServer, model: &str) -> Config {
    let mut config = Config::new(model, "test-key");
    config.llm_base_url = Some(server.uri());
    config
}

/// Gemini `generateContent` response with a single text part.
pub fn gemini_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 12,
            "candidatesTokenCount": 5,
            "totalTokenCount": 17
        }
    })
}

/// OpenAI chat completion response with the given message content.
pub fn openai_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content, "refusal": null },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24 }
    })
}

/// Anthropic message response containing a forced tool call.
pub fn anthropic_tool_response(input: Value) -> Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "tool_use", "id": "toolu_1", "name": "json", "input": input }],
        "stop_reason": "tool_use",
        "usage": { "input_tokens": 30, "output_tokens": 9 }
    })
}

/// Anthropic message response containing plain text.
pub fn anthropic_text_response(text: &str) -> Value {
    json!({
        "id": "msg_2",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 30, "output_tokens": 9 }
    })
}
