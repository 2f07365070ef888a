//! Workspace service: one user session's editable state and the analyze action.
//!
//! DESIGN
//! ======
//! A `Workspace` owns the code draft, the goal, loading/error status, the
//! active result tab, the latest `AnalysisResult`, per-category collapse
//! flags, and the preview debouncer. State changes are synchronous methods;
//! `run_analysis` is the only async path and never holds the workspace lock
//! across the model call.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures set a user-visible message and never reach the model.
//! Service and parse failures are logged in full and surfaced as one generic
//! message. The model call runs in a spawned task that catches panics and
//! always clears `loading`, even when the HTTP caller goes away mid-flight.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::advisor::{self, AdvisorError, AnalysisResult, Category};
use super::debounce::Debouncer;
use super::display::{self, DisplayState};
use super::preview::{self, PreviewDocument, PreviewSnapshot};
use crate::llm::LlmGenerate;

pub const DEFAULT_GOAL: &str = "Make it more modern and improve accessibility.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred while analyzing the code. Please check the server logs for details.";

// =============================================================================
// TYPES
// =============================================================================

/// The user's code and improvement goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDraft {
    pub html: String,
    pub css: String,
    pub js: String,
    pub goal: String,
}

impl Default for CodeDraft {
    fn default() -> Self {
        Self { html: String::new(), css: String::new(), js: String::new(), goal: DEFAULT_GOAL.to_string() }
    }
}

impl CodeDraft {
    #[must_use]
    pub fn has_code(&self) -> bool {
        [&self.html, &self.css, &self.js]
            .iter()
            .any(|field| !field.is_empty())
    }

    #[must_use]
    pub fn snapshot(&self) -> PreviewSnapshot {
        PreviewSnapshot { html: self.html.clone(), css: self.css.clone(), js: self.js.clone() }
    }
}

/// Partial update to a draft. Absent fields are left unchanged.
///
/// `seq` is the client's edit counter. A field is only overwritten by an
/// edit whose `seq` is higher than the last one applied to that field, so
/// requests that arrive out of order cannot roll a field back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftEdit {
    pub html: Option<String>,
    pub css: Option<String>,
    pub js: Option<String>,
    pub goal: Option<String>,
    pub seq: Option<u64>,
}

/// Highest edit `seq` applied per draft field.
#[derive(Debug, Clone, Copy, Default)]
struct EditSequence {
    html: u64,
    css: u64,
    js: u64,
    goal: u64,
}

fn accept_seq(last: &mut u64, seq: Option<u64>) -> bool {
    match seq {
        None => true,
        Some(n) if n > *last => {
            *last = n;
            true
        }
        Some(_) => false,
    }
}

/// Which result panel is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTab {
    #[default]
    Suggestions,
    Preview,
}

/// Analyze requests refused before any model call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzeRejection {
    #[error("Please provide some code to analyze.")]
    NoCode,
    #[error("Please specify your improvement goal.")]
    NoGoal,
    #[error("An analysis is already in progress.")]
    InProgress,
}

impl crate::error::ErrorCode for AnalyzeRejection {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoCode => "E_NO_CODE",
            Self::NoGoal => "E_NO_GOAL",
            Self::InProgress => "E_IN_PROGRESS",
        }
    }
}

/// Analyze requests that reached the model and failed.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeFailure {
    #[error(transparent)]
    Advisor(#[from] AdvisorError),
    #[error("analysis task aborted")]
    Aborted,
}

impl crate::error::ErrorCode for AnalyzeFailure {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Advisor(e) => e.error_code(),
            Self::Aborted => "E_ANALYSIS_ABORTED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Advisor(e) if e.retryable())
    }
}

#[derive(Debug)]
pub enum AnalyzeStatus {
    Completed,
    Rejected(AnalyzeRejection),
    Failed(AnalyzeFailure),
}

#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub status: AnalyzeStatus,
    pub view: WorkspaceView,
}

/// Serializable snapshot of a workspace, returned by every API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceView {
    pub id: Uuid,
    pub draft: CodeDraft,
    pub loading: bool,
    pub error: Option<String>,
    pub active_tab: ActiveTab,
    pub result: Option<AnalysisResult>,
    pub expanded: Vec<Category>,
    pub suggestions_html: Option<String>,
}

// =============================================================================
// WORKSPACE
// =============================================================================

pub struct Workspace {
    id: Uuid,
    draft: CodeDraft,
    loading: bool,
    error: Option<String>,
    result: Option<AnalysisResult>,
    active_tab: ActiveTab,
    display: DisplayState,
    preview: Debouncer,
    edit_seq: EditSequence,
}

impl Workspace {
    #[must_use]
    pub fn new(id: Uuid, preview_debounce: Duration) -> Self {
        Self {
            id,
            draft: CodeDraft::default(),
            loading: false,
            error: None,
            result: None,
            active_tab: ActiveTab::default(),
            display: DisplayState::default(),
            preview: Debouncer::new(preview_debounce),
            edit_seq: EditSequence::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn draft(&self) -> &CodeDraft {
        &self.draft
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab
    }

    /// Apply user edits. A change to any code field restarts the preview
    /// countdown; goal edits do not touch the preview. Fields whose edit is
    /// older than the last applied one are skipped.
    pub fn apply_edit(&mut self, edit: DraftEdit) {
        let seq = edit.seq;
        let mut code_changed = false;
        let mut stale = 0usize;
        for (field, last, value) in [
            (&mut self.draft.html, &mut self.edit_seq.html, edit.html),
            (&mut self.draft.css, &mut self.edit_seq.css, edit.css),
            (&mut self.draft.js, &mut self.edit_seq.js, edit.js),
        ] {
            let Some(value) = value else { continue };
            if !accept_seq(last, seq) {
                stale += 1;
                continue;
            }
            if *field != value {
                *field = value;
                code_changed = true;
            }
        }
        if let Some(goal) = edit.goal {
            if accept_seq(&mut self.edit_seq.goal, seq) {
                self.draft.goal = goal;
            } else {
                stale += 1;
            }
        }
        if stale > 0 {
            debug!(workspace_id = %self.id, ?seq, stale, "workspace: stale edit ignored");
        }
        if code_changed {
            debug!(
                workspace_id = %self.id,
                delay_ms = self.preview.delay().as_millis(),
                "workspace: preview rescheduled"
            );
            self.preview.schedule(self.draft.snapshot());
        }
    }

    pub fn set_active_tab(&mut self, tab: ActiveTab) {
        self.active_tab = tab;
    }

    /// Flip a category's collapse flag; returns the new expanded flag.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        self.display.toggle(category)
    }

    /// Validate and enter the loading state. Returns the draft to submit.
    ///
    /// # Errors
    ///
    /// [`AnalyzeRejection::NoCode`] / [`AnalyzeRejection::NoGoal`] set the
    /// user-visible error; [`AnalyzeRejection::InProgress`] leaves state as is.
    pub fn begin_analysis(&mut self) -> Result<CodeDraft, AnalyzeRejection> {
        if self.loading {
            return Err(AnalyzeRejection::InProgress);
        }
        let rejection = if !self.draft.has_code() {
            Some(AnalyzeRejection::NoCode)
        } else if self.draft.goal.is_empty() {
            Some(AnalyzeRejection::NoGoal)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            warn!(workspace_id = %self.id, %rejection, "workspace: analyze rejected");
            self.error = Some(rejection.to_string());
            return Err(rejection);
        }

        self.loading = true;
        self.error = None;
        self.result = None;
        self.active_tab = ActiveTab::Suggestions;
        Ok(self.draft.clone())
    }

    /// Leave the loading state with the outcome of the model call.
    pub fn finish_analysis(&mut self, outcome: Result<AnalysisResult, AnalyzeFailure>) -> AnalyzeStatus {
        self.loading = false;
        match outcome {
            Ok(result) => {
                info!(workspace_id = %self.id, suggestions = result.total(), "workspace: analysis complete");
                self.result = Some(result);
                self.display = DisplayState::default();
                self.active_tab = ActiveTab::Suggestions;
                AnalyzeStatus::Completed
            }
            Err(failure) => {
                error!(workspace_id = %self.id, error = %failure, "workspace: analysis failed");
                self.error = Some(GENERIC_FAILURE_MESSAGE.to_string());
                AnalyzeStatus::Failed(failure)
            }
        }
    }

    /// Rendered suggestions panel, when a result exists.
    #[must_use]
    pub fn suggestions_html(&self) -> Option<String> {
        self.result
            .as_ref()
            .map(|result| display::render_suggestions(result, &self.display))
    }

    /// Preview built from the debounced snapshot.
    #[must_use]
    pub fn preview_document(&self) -> PreviewDocument {
        preview::render_preview(&self.preview.current())
    }

    #[must_use]
    pub fn subscribe_preview(&self) -> watch::Receiver<PreviewSnapshot> {
        self.preview.subscribe()
    }

    #[must_use]
    pub fn view(&self) -> WorkspaceView {
        WorkspaceView {
            id: self.id(),
            draft: self.draft().clone(),
            loading: self.is_loading(),
            error: self.error().map(str::to_owned),
            active_tab: self.active_tab(),
            result: self.result().cloned(),
            expanded: self.display.expanded(),
            suggestions_html: self.suggestions_html(),
        }
    }
}

// =============================================================================
// ANALYZE
// =============================================================================

/// Run the analyze action for a shared workspace.
pub async fn run_analysis(workspace: Arc<Mutex<Workspace>>, llm: Arc<dyn LlmGenerate>) -> AnalyzeOutcome {
    let submission = {
        let mut ws = workspace.lock().await;
        match ws.begin_analysis() {
            Ok(draft) => draft,
            Err(rejection) => return AnalyzeOutcome { status: AnalyzeStatus::Rejected(rejection), view: ws.view() },
        }
    };

    let task_workspace = Arc::clone(&workspace);
    let task = tokio::spawn(async move {
        let request = advisor::request_suggestions(
            llm.as_ref(),
            &submission.html,
            &submission.css,
            &submission.js,
            &submission.goal,
        );
        let outcome = match AssertUnwindSafe(request).catch_unwind().await {
            Ok(result) => result.map_err(AnalyzeFailure::from),
            Err(_) => Err(AnalyzeFailure::Aborted),
        };
        let mut ws = task_workspace.lock().await;
        let status = ws.finish_analysis(outcome);
        AnalyzeOutcome { status, view: ws.view() }
    });

    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "workspace: analysis task did not complete");
            let mut ws = workspace.lock().await;
            if ws.is_loading() {
                let status = ws.finish_analysis(Err(AnalyzeFailure::Aborted));
                return AnalyzeOutcome { status, view: ws.view() };
            }
            AnalyzeOutcome { status: AnalyzeStatus::Failed(AnalyzeFailure::Aborted), view: ws.view() }
        }
    }
}

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;
