//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the LLM client built at startup and a map of live workspaces.
//! Each workspace sits behind its own mutex so one session's analysis never
//! blocks another's edits. Every lookup refreshes the entry's
//! `last_touched`, and `sweep_idle` drops sessions the browser abandoned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::llm::LlmGenerate;
use crate::services::workspace::Workspace;

pub type SharedWorkspace = Arc<Mutex<Workspace>>;

/// Registry slot: the workspace plus the last time a request reached it.
pub struct WorkspaceEntry {
    pub workspace: SharedWorkspace,
    pub last_touched: Instant,
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub workspaces: Arc<RwLock<HashMap<Uuid, WorkspaceEntry>>>,
    pub llm: Arc<dyn LlmGenerate>,
    pub preview_debounce: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmGenerate>, preview_debounce: Duration) -> Self {
        Self { workspaces: Arc::new(RwLock::new(HashMap::new())), llm, preview_debounce }
    }

    /// Create and register a fresh workspace.
    pub async fn create_workspace(&self) -> (Uuid, SharedWorkspace) {
        let id = Uuid::new_v4();
        let workspace = Arc::new(Mutex::new(Workspace::new(id, self.preview_debounce)));
        let entry = WorkspaceEntry { workspace: Arc::clone(&workspace), last_touched: Instant::now() };
        self.workspaces.write().await.insert(id, entry);
        (id, workspace)
    }

    /// Look up a workspace and mark it as recently used.
    pub async fn workspace(&self, id: Uuid) -> Option<SharedWorkspace> {
        let mut workspaces = self.workspaces.write().await;
        let entry = workspaces.get_mut(&id)?;
        entry.last_touched = Instant::now();
        Some(Arc::clone(&entry.workspace))
    }

    /// Remove a workspace. Returns `false` if it did not exist.
    pub async fn remove_workspace(&self, id: Uuid) -> bool {
        self.workspaces.write().await.remove(&id).is_some()
    }

    /// Drop every workspace untouched for at least `max_idle`. Returns the
    /// number removed.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut workspaces = self.workspaces.write().await;
        let before = workspaces.len();
        workspaces.retain(|_, entry| now.duration_since(entry.last_touched) < max_idle);
        before - workspaces.len()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
