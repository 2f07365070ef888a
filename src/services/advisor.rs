//! Advisor service: code + goal → LLM → categorized suggestions.
//!
//! DESIGN
//! ======
//! Builds one prompt from the user's HTML, CSS, JavaScript and improvement
//! goal, asks the model for a JSON document with six fixed category arrays,
//! and parses it into an [`AnalysisResult`]. A single request per call; no
//! retries. Payloads that are not a JSON object of the expected shape fail
//! with [`AdvisorError::InvalidResponse`] and are logged verbatim.

use std::fmt::Write;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::llm::LlmGenerate;
use crate::llm::types::{GenerateRequest, LlmError, Schema};

const SCHEMA_NAME: &str = "website_analysis";

const EMPTY_HTML: &str = "<!-- No HTML provided -->";
const EMPTY_CSS: &str = "/* No CSS provided */";
const EMPTY_JS: &str = "// No JavaScript provided";

// =============================================================================
// TYPES
// =============================================================================

/// One improvement recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    #[serde(rename = "codeSnippet", default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

/// Fixed suggestion categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Html,
    Css,
    Javascript,
    UiUx,
    Performance,
    Accessibility,
}

impl Category {
    pub const ALL: [Self; 6] =
        [Self::Html, Self::Css, Self::Javascript, Self::UiUx, Self::Performance, Self::Accessibility];

    /// Wire key used in the model response.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Javascript => "javascript",
            Self::UiUx => "ui_ux",
            Self::Performance => "performance",
            Self::Accessibility => "accessibility",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Human-readable heading.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::Css => "CSS",
            Self::Javascript => "JavaScript",
            Self::UiUx => "UI/UX",
            Self::Performance => "Performance",
            Self::Accessibility => "Accessibility",
        }
    }

    fn schema_description(self) -> &'static str {
        match self {
            Self::Html => "Suggestions related to HTML structure, semantics, and best practices.",
            Self::Css => {
                "Suggestions for improving CSS, styling, layout, and responsiveness. \
                 Include Bootstrap-specific advice if applicable."
            }
            Self::Javascript => {
                "Suggestions for JavaScript code, logic, performance, and modern practices. \
                 Emphasize robust error handling: try/catch blocks, user-friendly error messages, \
                 and logging errors to a service for developers."
            }
            Self::UiUx => "Suggestions for improving the overall user interface and user experience.",
            Self::Performance => "Suggestions for optimizing website performance and loading speed.",
            Self::Accessibility => {
                "Suggestions for making the website more accessible (a11y) to users with disabilities."
            }
        }
    }
}

/// Full categorized answer for one analysis request. Replaced wholesale on
/// every successful request, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub html: Vec<Suggestion>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub css: Vec<Suggestion>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub javascript: Vec<Suggestion>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ui_ux: Vec<Suggestion>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub performance: Vec<Suggestion>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub accessibility: Vec<Suggestion>,
}

/// A category the model sent as `null` reads the same as an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Suggestion>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<Suggestion>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl AnalysisResult {
    #[must_use]
    pub fn get(&self, category: Category) -> &[Suggestion] {
        match category {
            Category::Html => &self.html,
            Category::Css => &self.css,
            Category::Javascript => &self.javascript,
            Category::UiUx => &self.ui_ux,
            Category::Performance => &self.performance,
            Category::Accessibility => &self.accessibility,
        }
    }

    /// Categories paired with their suggestions, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Suggestion])> {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.iter().map(|(_, s)| s.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("suggestion request failed: {0}")]
    Service(#[from] LlmError),
    #[error("received an invalid JSON response from the model: {0}")]
    InvalidResponse(String),
}

impl crate::error::ErrorCode for AdvisorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Service(_) => "E_LLM_ERROR",
            Self::InvalidResponse(_) => "E_INVALID_RESPONSE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Service(e) if e.retryable())
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Ask the model for suggestions on the given code.
///
/// # Errors
///
/// [`AdvisorError::Service`] when the call cannot complete,
/// [`AdvisorError::InvalidResponse`] when the answer does not match the
/// response contract.
pub async fn request_suggestions(
    llm: &dyn LlmGenerate,
    html: &str,
    css: &str,
    js: &str,
    goal: &str,
) -> Result<AnalysisResult, AdvisorError> {
    info!(
        html_len = html.len(),
        css_len = css.len(),
        js_len = js.len(),
        goal_len = goal.len(),
        "advisor: requesting suggestions"
    );

    let prompt = build_prompt(html, css, js, goal);
    let request = GenerateRequest { prompt: &prompt, schema_name: SCHEMA_NAME, schema: analysis_schema() };
    let response = llm.generate(&request).await?;

    let result = parse_analysis(&response.text).inspect_err(|e| {
        error!(error = %e, payload = %response.text, "advisor: failed to parse model response");
    })?;

    info!(
        model = %response.model,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        suggestions = result.total(),
        "advisor: suggestions received"
    );
    Ok(result)
}

// =============================================================================
// PROMPT
// =============================================================================

pub(crate) fn build_prompt(html: &str, css: &str, js: &str, goal: &str) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "**User's Goal:** {goal}");
    prompt.push('\n');
    prompt.push_str(
        "Analyze the following website code. The user has provided their HTML, CSS (which might include \
         Bootstrap), and JavaScript.\n\
         Provide specific, actionable suggestions to achieve the user's goal. For each suggestion, provide a \
         title, a clear description of the problem and the proposed solution, and an optional corrected code \
         snippet in markdown.\n\
         Categorize your suggestions into HTML, CSS, JavaScript, UI/UX, Performance, and Accessibility. If a \
         section of code is empty, provide general best-practice suggestions for that category.\n\n",
    );
    prompt.push_str(
        "**JavaScript Analysis Guidelines:**\n\
         Pay special attention to error handling. Where applicable, suggest:\n\
         1. Wrapping potentially failing operations (like API calls or complex calculations) in `try...catch` \
         blocks.\n\
         2. Implementing a user-friendly error display mechanism instead of showing raw error messages (e.g., \
         updating a status message on the page instead of using `alert()`).\n\
         3. Logging detailed error information for developers using `console.error`, and mention the concept \
         of sending errors to a remote logging service in a production environment.\n\n",
    );
    let _ = writeln!(prompt, "--- HTML ---\n{}\n", or_placeholder(html, EMPTY_HTML));
    let _ = writeln!(prompt, "--- CSS ---\n{}\n", or_placeholder(css, EMPTY_CSS));
    let _ = writeln!(prompt, "--- JAVASCRIPT ---\n{}", or_placeholder(js, EMPTY_JS));
    prompt
}

fn or_placeholder<'a>(code: &'a str, placeholder: &'a str) -> &'a str {
    if code.is_empty() { placeholder } else { code }
}

// =============================================================================
// SCHEMA
// =============================================================================

pub(crate) fn analysis_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let suggestion = Schema::Object {
            properties: vec![
                (
                    "title".into(),
                    Schema::String { description: Some("A concise title for the suggestion.".into()), nullable: false },
                ),
                (
                    "description".into(),
                    Schema::String {
                        description: Some(
                            "A detailed explanation of the issue and the recommended improvement.".into(),
                        ),
                        nullable: false,
                    },
                ),
                (
                    "codeSnippet".into(),
                    Schema::String {
                        description: Some(
                            "An optional code snippet demonstrating the suggested change. Use markdown for code."
                                .into(),
                        ),
                        nullable: true,
                    },
                ),
            ],
            required: vec!["title".into(), "description".into()],
            description: None,
        };

        Schema::Object {
            properties: Category::ALL
                .into_iter()
                .map(|c| {
                    let items = Box::new(suggestion.clone());
                    (c.key().to_string(), Schema::Array { items, description: Some(c.schema_description().into()) })
                })
                .collect(),
            required: Category::ALL.into_iter().map(|c| c.key().to_string()).collect(),
            description: None,
        }
    })
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse the model's text payload into an [`AnalysisResult`].
///
/// Unknown keys are ignored and missing categories are treated as empty
/// (logged at warn). Anything that is not a JSON object whose category
/// values are arrays of `{title, description, codeSnippet?}` is rejected.
pub(crate) fn parse_analysis(text: &str) -> Result<AnalysisResult, AdvisorError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;

    let Value::Object(map) = &value else {
        return Err(AdvisorError::InvalidResponse("expected a JSON object".into()));
    };

    let missing: Vec<&str> = Category::ALL
        .into_iter()
        .map(Category::key)
        .filter(|key| !map.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "advisor: response missing categories, treating as empty");
    }

    serde_json::from_value(value).map_err(|e| AdvisorError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
#[path = "advisor_test.rs"]
mod tests;
