//! Prompt execution against the configured model.
//!
//! Models that support native structured output get a single schema-enforced
//! request. Models that don't are driven through a bounded self-correcting
//! loop: each failed parse or validation is fed back to the model on the next
//! attempt, up to [`MAX_RETRIES`] attempts.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AttemptError, ProviderError, RunnerError};
use crate::llm::json::parse_json_response;
use crate::llm::prompt::{RetryAttempt, build_correction_prompt};
use crate::llm::registry::{self, ProviderFamily};
use crate::llm::schema::Schema;
use crate::provider::{GenerateRequest, ProviderClient, ProviderSettings, Usage};

/// Attempts allowed in the self-correcting loop.
pub const MAX_RETRIES: usize = 5;

/// One prompt-to-object request.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub schema: Schema,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, schema: Schema) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            schema,
        }
    }

    /// Request whose schema is derived from `T`.
    pub fn for_type<T: schemars::JsonSchema>(
        prompt: impl Into<String>,
    ) -> Result<Self, crate::error::SchemaError> {
        Ok(Self::new(prompt, Schema::for_type::<T>()?))
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Builds a provider client for a family.
///
/// This abstraction allows substituting clients in tests.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        family: ProviderFamily,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn ProviderClient>, ProviderError>;
}

/// Factory that uses each family's registered constructor.
pub struct DefaultFactory;

impl ClientFactory for DefaultFactory {
    fn create(
        &self,
        family: ProviderFamily,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn ProviderClient>, ProviderError> {
        (family.factory())(settings)
    }
}

/// Runs prompts against the configured model.
pub struct PromptRunner<F = DefaultFactory> {
    config: Config,
    factory: F,
}

impl PromptRunner<DefaultFactory> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: DefaultFactory,
        }
    }
}

impl<F: ClientFactory> PromptRunner<F> {
    pub fn with_factory(config: Config, factory: F) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a prompt and return a value that satisfies the request's schema.
    pub async fn run_prompt(&self, request: &PromptRequest) -> Result<Value, RunnerError> {
        let entry = registry::lookup(&self.config.llm_model)?;

        let settings = ProviderSettings {
            api_key: self.config.llm_api_key.clone(),
            base_url: self.config.llm_base_url.clone(),
            timeout: self.config.timeout,
        };
        let client = self.factory.create(entry.family, &settings)?;

        let generate = GenerateRequest {
            model: entry.name.to_string(),
            prompt: request.prompt.clone(),
            system_prompt: request.system_prompt.clone(),
        };

        if entry.supports_structured_output {
            debug!(model = entry.name, "using native structured output");
            let generation = client.generate_object(&generate, &request.schema).await?;
            self.log_usage(generation.usage.as_ref());
            Ok(generation.value)
        } else {
            debug!(model = entry.name, "using self-correcting text loop");
            run_correction_loop(client.as_ref(), &generate, &request.schema, |usage| {
                self.log_usage(usage)
            })
            .await
        }
    }

    /// Run a prompt and deserialize the validated value into `T`.
    pub async fn run_prompt_as<T: DeserializeOwned>(
        &self,
        request: &PromptRequest,
    ) -> Result<T, RunnerError> {
        let value = self.run_prompt(request).await?;
        serde_json::from_value(value).map_err(RunnerError::Deserialize)
    }

    fn log_usage(&self, usage: Option<&Usage>) {
        if !self.config.debug {
            return;
        }
        if let Some(usage) = usage
            && let Ok(pretty) = serde_json::to_string_pretty(usage)
        {
            info!("Token usage:\n{}", pretty);
        }
    }
}

/// Drive a text-only model until it produces a schema-valid object.
///
/// Provider errors end the loop immediately; only parse and validation
/// failures are retried.
pub(crate) async fn run_correction_loop<C, L>(
    client: &C,
    request: &GenerateRequest,
    schema: &Schema,
    mut on_usage: L,
) -> Result<Value, RunnerError>
where
    C: ProviderClient + ?Sized,
    L: FnMut(Option<&Usage>),
{
    let mut retry_count = 0;
    let mut previous_errors: Vec<RetryAttempt> = Vec::new();

    while retry_count < MAX_RETRIES {
        let attempt_request = GenerateRequest {
            system_prompt: Some(build_correction_prompt(
                request.system_prompt.as_deref(),
                schema,
                &previous_errors,
            )),
            ..request.clone()
        };

        let generation = client.generate_text(&attempt_request).await?;
        on_usage(generation.usage.as_ref());

        match check_attempt(&generation.text, schema) {
            Ok(value) => return Ok(value),
            Err(e) => {
                retry_count += 1;
                warn!(
                    attempt = retry_count,
                    max = MAX_RETRIES,
                    "Response rejected: {}",
                    e
                );
                previous_errors.push(RetryAttempt {
                    error_message: e.to_string(),
                    raw_response: generation.text,
                });
            }
        }
    }

    let last_error = previous_errors
        .last()
        .map(|attempt| attempt.error_message.clone())
        .unwrap_or_default();

    Err(RunnerError::RetriesExhausted {
        attempts: retry_count,
        last_error,
    })
}

/// Parse and validate one attempt's text.
fn check_attempt(text: &str, schema: &Schema) -> Result<Value, AttemptError> {
    let value = parse_json_response(text).map_err(|e| AttemptError::JsonParse(e.to_string()))?;
    schema
        .validate(&value)
        .map_err(AttemptError::SchemaValidation)?;
    Ok(value)
}
