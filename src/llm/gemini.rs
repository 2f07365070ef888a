//! Gemini `generateContent` API client.
//!
//! Thin HTTP wrapper for `/models/{model}:generateContent` with structured
//! JSON output. Pure parsing in `parse_response` for testability.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::config::LlmTimeouts;
use super::types::{GenerateRequest, GenerateResponse, LlmError};

const RESPONSE_MIME_TYPE: &str = "application/json";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url })
    }

    pub async fn generate(&self, model: &str, request: &GenerateRequest<'_>) -> Result<GenerateResponse, LlmError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let body = build_request(request);

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }

        parse_response(&text, model)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ApiRequest<'a> {
    contents: Vec<ApiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct ApiContent<'a> {
    role: &'static str,
    parts: Vec<ApiPart<'a>>,
}

#[derive(Serialize)]
struct ApiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn build_request<'a>(request: &GenerateRequest<'a>) -> ApiRequest<'a> {
    ApiRequest {
        contents: vec![ApiContent { role: "user", parts: vec![ApiPart { text: request.prompt }] }],
        generation_config: GenerationConfig {
            response_mime_type: RESPONSE_MIME_TYPE,
            response_schema: request.schema.to_gemini(),
        },
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_response(json: &str, requested_model: &str) -> Result<GenerateResponse, LlmError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    let (input_tokens, output_tokens) = api
        .usage_metadata
        .map_or((0, 0), |u| (u.prompt_token_count, u.candidates_token_count));
    let model = api
        .model_version
        .unwrap_or_else(|| requested_model.to_string());

    let Some(candidate) = api.candidates.into_iter().next() else {
        let reason = api
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(LlmError::EmptyResponse(reason));
    };

    // Thought summaries are not part of the answer.
    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(LlmError::EmptyResponse(reason));
    }

    Ok(GenerateResponse { text, model, input_tokens, output_tokens })
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
