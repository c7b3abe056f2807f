//! prompt-runner - Run prompts against hosted LLMs and get back schema-validated JSON.
//!
//! # Overview
//!
//! A model name from the configuration is resolved against a static registry
//! of Anthropic, OpenAI and Google models. Models with native structured
//! output receive the JSON schema directly; the rest are driven through a
//! bounded self-correcting loop that feeds parse and validation errors back
//! to the model until it produces a valid object.

pub mod config;
pub mod error;
pub mod llm;
pub mod provider;

// Re-export commonly used types
pub use config::Config;
pub use error::{AttemptError, ConfigError, ProviderError, RunnerError, SchemaError};
pub use llm::{ModelEntry, PromptRequest, PromptRunner, ProviderFamily, Schema};
pub use provider::{ProviderClient, Usage};
