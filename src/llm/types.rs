//! LLM types: provider-neutral request/response types and errors.
//!
//! Shared by the Gemini and `OpenAI` clients. The response schema is modelled
//! as a small typed tree so each provider can render it in its own dialect.

use serde_json::{Map, Value, json};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider answered but produced no text (blocked, refused, truncated).
    #[error("API returned no content: {0}")]
    EmptyResponse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::EmptyResponse(_) => "E_EMPTY_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// RESPONSE SCHEMA
// =============================================================================

/// Structured-output schema node.
///
/// Gemini wants OpenAPI-style uppercase types with a `nullable` flag, while
/// `OpenAI` strict mode wants JSON Schema with every property required and
/// nullability expressed as a `null` type union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    String { description: Option<String>, nullable: bool },
    Array { items: Box<Schema>, description: Option<String> },
    Object { properties: Vec<(String, Schema)>, required: Vec<String>, description: Option<String> },
}

impl Schema {
    /// Render as a Gemini `responseSchema` value.
    #[must_use]
    pub fn to_gemini(&self) -> Value {
        match self {
            Self::String { description, nullable } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("STRING"));
                insert_description(&mut node, description.as_deref());
                if *nullable {
                    node.insert("nullable".into(), json!(true));
                }
                Value::Object(node)
            }
            Self::Array { items, description } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("ARRAY"));
                node.insert("items".into(), items.to_gemini());
                insert_description(&mut node, description.as_deref());
                Value::Object(node)
            }
            Self::Object { properties, required, description } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_gemini()))
                    .collect();
                let ordering: Vec<&str> = properties.iter().map(|(name, _)| name.as_str()).collect();
                let mut node = Map::new();
                node.insert("type".into(), json!("OBJECT"));
                node.insert("properties".into(), Value::Object(props));
                node.insert("propertyOrdering".into(), json!(ordering));
                node.insert("required".into(), json!(required));
                insert_description(&mut node, description.as_deref());
                Value::Object(node)
            }
        }
    }

    /// Render as a strict-mode JSON Schema value.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::String { description, nullable } => {
                let mut node = Map::new();
                let ty = if *nullable { json!(["string", "null"]) } else { json!("string") };
                node.insert("type".into(), ty);
                insert_description(&mut node, description.as_deref());
                Value::Object(node)
            }
            Self::Array { items, description } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("array"));
                node.insert("items".into(), items.to_json_schema());
                insert_description(&mut node, description.as_deref());
                Value::Object(node)
            }
            Self::Object { properties, description, .. } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                let all: Vec<&str> = properties.iter().map(|(name, _)| name.as_str()).collect();
                let mut node = Map::new();
                node.insert("type".into(), json!("object"));
                node.insert("properties".into(), Value::Object(props));
                node.insert("required".into(), json!(all));
                node.insert("additionalProperties".into(), json!(false));
                insert_description(&mut node, description.as_deref());
                Value::Object(node)
            }
        }
    }
}

fn insert_description(node: &mut Map<String, Value>, description: Option<&str>) {
    if let Some(text) = description {
        node.insert("description".into(), Value::String(text.to_owned()));
    }
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// One structured-output generation request.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    /// Full natural-language prompt.
    pub prompt: &'a str,
    /// Name reported to providers that label their schemas.
    pub schema_name: &'a str,
    /// Required shape of the JSON document the model must return.
    pub schema: &'a Schema,
}

/// Raw text answer from a generation call. The text is expected to be a JSON
/// document matching the request schema, but is not validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =============================================================================
// LLM GENERATE TRAIT
// =============================================================================

/// Provider-neutral async trait for JSON generation. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmGenerate: Send + Sync {
    /// Send a generation request to the LLM provider.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, the provider envelope is
    /// malformed, or the model produced no text.
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<GenerateResponse, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
