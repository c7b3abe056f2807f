//! Error types for prompt-runner modules using thiserror.

use thiserror::Error;

use crate::llm::registry::ProviderFamily;

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set in the environment")]
    MissingVar(&'static str),
}

/// Errors from building or loading a JSON schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid JSON schema: {0}")]
    Invalid(String),

    #[error("Failed to read schema file: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Failed to derive schema for type: {0}")]
    Generate(#[source] serde_json::Error),
}

/// Errors from a single provider request.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("{provider} request failed: {source}")]
    Request {
        provider: ProviderFamily,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: ProviderFamily,
        status: u16,
        body: String,
    },

    #[error("{provider} refused the request: {message}")]
    Refused {
        provider: ProviderFamily,
        message: String,
    },

    #[error("{0} response did not contain any content")]
    EmptyResponse(ProviderFamily),

    #[error("{provider} returned invalid JSON: {message}")]
    InvalidJson {
        provider: ProviderFamily,
        message: String,
    },

    #[error("{provider} response does not match the schema: {message}")]
    SchemaMismatch {
        provider: ProviderFamily,
        message: String,
    },
}

/// Recoverable failure of one self-correcting attempt.
///
/// These never reach the caller directly; their messages are fed back to the
/// model on the next attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Failed to parse JSON: {0}")]
    JsonParse(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),
}

/// Errors surfaced by `PromptRunner`.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Unknown model '{0}'. Run with --list-models to see supported models.")]
    UnknownModel(String),

    #[error("Failed to get a valid response after {attempts} attempts. Last error: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Validated response does not fit the requested type: {0}")]
    Deserialize(#[source] serde_json::Error),
}
