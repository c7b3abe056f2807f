//! JSON Schema handling for structured responses.
//!
//! A [`Schema`] holds the raw schema document (sent to providers and rendered
//! into prompts) alongside a compiled validator used to check responses.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::SchemaError;

/// A compiled JSON Schema describing the expected output shape.
#[derive(Clone)]
pub struct Schema {
    document: Value,
    compiled: Arc<JSONSchema>,
}

impl Schema {
    /// Compile a schema from a JSON Schema document.
    pub fn new(document: Value) -> Result<Self, SchemaError> {
        let compiled = JSONSchema::compile(&document)
            .map_err(|e| SchemaError::Invalid(e.to_string()))?;

        Ok(Self {
            document,
            compiled: Arc::new(compiled),
        })
    }

    /// Derive a schema from a Rust type.
    pub fn for_type<T: schemars::JsonSchema>() -> Result<Self, SchemaError> {
        let root = schemars::schema_for!(T);
        let document = serde_json::to_value(&root).map_err(SchemaError::Generate)?;
        Self::new(document)
    }

    /// Load a schema from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(SchemaError::ReadFailed)?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| SchemaError::Invalid(format!("{}: {}", path.display(), e)))?;
        Self::new(document)
    }

    /// The raw schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Pretty-printed schema, as shown to the model.
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| self.document.to_string())
    }

    /// Validate an instance, returning every violation joined into one message.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        match self.compiled.validate(instance) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let messages: Vec<String> = errors
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        if path.is_empty() {
                            e.to_string()
                        } else {
                            format!("{}: {}", path, e)
                        }
                    })
                    .collect();
                Err(messages.join("; "))
            }
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("document", &self.document)
            .finish()
    }
}
