//! OpenAI-compatible API client.
//!
//! Uses `/chat/completions` with a strict `json_schema` response format so
//! any OpenAI-compatible endpoint can stand in for Gemini.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::config::LlmTimeouts;
use super::types::{GenerateRequest, GenerateResponse, LlmError};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url })
    }

    pub async fn generate(&self, model: &str, request: &GenerateRequest<'_>) -> Result<GenerateResponse, LlmError> {
        let body = build_request(model, request);
        let text = self.send_json("/chat/completions", &body).await?;
        parse_chat_completions_response(&text)
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
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
        Ok(text)
    }
}

// =============================================================================
// CHAT COMPLETIONS: wire types
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    messages: Vec<CcMessage<'a>>,
    response_format: CcResponseFormat<'a>,
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CcResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: CcJsonSchema<'a>,
}

#[derive(Serialize)]
struct CcJsonSchema<'a> {
    name: &'a str,
    strict: bool,
    schema: Value,
}

fn build_request<'a>(model: &'a str, request: &GenerateRequest<'a>) -> CcRequest<'a> {
    CcRequest {
        model,
        messages: vec![CcMessage { role: "user", content: request.prompt }],
        response_format: CcResponseFormat {
            format_type: "json_schema",
            json_schema: CcJsonSchema {
                name: request.schema_name,
                strict: true,
                schema: request.schema.to_json_schema(),
            },
        },
    }
}

// =============================================================================
// CHAT COMPLETIONS: parsing
// =============================================================================

pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<GenerateResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let prompt_tokens = root
        .get("usage")
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let completion_tokens = root
        .get("usage")
        .and_then(|u| u.get("completion_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };
    let message = choice.get("message").cloned().unwrap_or(Value::Null);

    if let Some(refusal) = message.get("refusal").and_then(Value::as_str) {
        return Err(LlmError::EmptyResponse(format!("refused: {refusal}")));
    }

    match message.get("content").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(GenerateResponse {
            text: text.to_string(),
            model,
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }),
        _ => {
            let finish_reason = choice
                .get("finish_reason")
                .and_then(Value::as_str)
                .unwrap_or("stop");
            Err(LlmError::EmptyResponse(finish_reason.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
