//! Model registry, schema handling and prompt execution.

pub mod json;
pub mod prompt;
pub mod registry;
pub mod runner;
pub mod schema;

pub use json::parse_json_response;
pub use prompt::{RetryAttempt, build_correction_prompt};
pub use registry::{ModelEntry, ProviderFamily, lookup, models};
pub use runner::{ClientFactory, DefaultFactory, MAX_RETRIES, PromptRequest, PromptRunner};
pub use schema::Schema;
