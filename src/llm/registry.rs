//! Static model registry and provider families.

use std::fmt;

use crate::error::{ProviderError, RunnerError};
use crate::provider::{ProviderClient, ProviderSettings, anthropic, google, openai};

/// Builds a provider client from settings.
pub type ClientFactoryFn = fn(&ProviderSettings) -> Result<Box<dyn ProviderClient>, ProviderError>;

/// Hosted LLM vendors a model can be served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    Anthropic,
    OpenAi,
    Google,
}

impl ProviderFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::Anthropic => "Anthropic",
            ProviderFamily::OpenAi => "OpenAI",
            ProviderFamily::Google => "Google",
        }
    }

    /// Factory that constructs a client for this family.
    pub fn factory(&self) -> ClientFactoryFn {
        match self {
            ProviderFamily::Anthropic => anthropic::create_client,
            ProviderFamily::OpenAi => openai::create_client,
            ProviderFamily::Google => google::create_client,
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A known model and the family that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: &'static str,
    pub family: ProviderFamily,
    /// Whether the provider can enforce a JSON schema during generation.
    /// Models without it go through the self-correcting text loop.
    pub supports_structured_output: bool,
}

const fn entry(
    name: &'static str,
    family: ProviderFamily,
    supports_structured_output: bool,
) -> ModelEntry {
    ModelEntry {
        name,
        family,
        supports_structured_output,
    }
}

static MODELS: &[ModelEntry] = &[
    entry("claude-3-5-sonnet-20241022", ProviderFamily::Anthropic, true),
    entry("claude-3-5-haiku-20241022", ProviderFamily::Anthropic, true),
    entry("claude-3-7-sonnet-20250219", ProviderFamily::Anthropic, true),
    entry("gpt-4o", ProviderFamily::OpenAi, true),
    entry("gpt-4o-mini", ProviderFamily::OpenAi, true),
    entry("o1", ProviderFamily::OpenAi, true),
    entry("o3-mini", ProviderFamily::OpenAi, true),
    entry("gemini-1.5-pro", ProviderFamily::Google, true),
    entry("gemini-1.5-flash", ProviderFamily::Google, true),
    entry("gemini-2.0-flash", ProviderFamily::Google, true),
    entry("gemini-2.0-flash-lite", ProviderFamily::Google, true),
    entry("gemini-2.0-flash-thinking-exp-01-21", ProviderFamily::Google, false),
    entry("gemini-2.5-pro-exp-03-25", ProviderFamily::Google, true),
];

/// All registered models, in definition order.
pub fn models() -> &'static [ModelEntry] {
    MODELS
}

/// Find the registry entry for a model name (exact match).
pub fn lookup(name: &str) -> Result<&'static ModelEntry, RunnerError> {
    MODELS
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| RunnerError::UnknownModel(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_model_names_are_unique() {
        let mut seen = HashSet::new();
        for entry in models() {
            assert!(seen.insert(entry.name), "duplicate model name {}", entry.name);
        }
    }

    #[test]
    fn test_lookup_known_model() {
        let entry = lookup("gpt-4o").unwrap();
        assert_eq!(entry.family, ProviderFamily::OpenAi);
        assert!(entry.supports_structured_output);
    }

    #[test]
    fn test_lookup_thinking_model_is_text_only() {
        let entry = lookup("gemini-2.0-flash-thinking-exp-01-21").unwrap();
        assert_eq!(entry.family, ProviderFamily::Google);
        assert!(!entry.supports_structured_output);
    }

    #[test]
    fn test_lookup_requires_exact_match() {
        assert!(matches!(lookup("GPT-4o"), Err(RunnerError::UnknownModel(_))));
        assert!(matches!(lookup("gpt-4"), Err(RunnerError::UnknownModel(_))));
        assert!(matches!(lookup(""), Err(RunnerError::UnknownModel(_))));
    }

    #[test]
    fn test_unknown_model_error_names_the_model() {
        let err = lookup("llama-3").unwrap_err();
        assert!(err.to_string().contains("llama-3"));
    }

    #[test]
    fn test_thinking_variants_are_flagged_text_only() {
        // Names carry the "thinking" marker today; the flag is what dispatch reads.
        for entry in models().iter().filter(|e| e.name.contains("thinking")) {
            assert!(
                !entry.supports_structured_output,
                "{} should use the text loop",
                entry.name
            );
        }
    }

    #[test]
    fn test_family_display() {
        assert_eq!(ProviderFamily::Anthropic.to_string(), "Anthropic");
        assert_eq!(ProviderFamily::OpenAi.to_string(), "OpenAI");
        assert_eq!(ProviderFamily::Google.to_string(), "Google");
    }
}
