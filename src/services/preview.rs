//! Preview renderer: user HTML/CSS/JS → sandboxed document.
//!
//! DESIGN
//! ======
//! A pure function of the three code strings. The document carries an error
//! overlay and a boundary script: synchronous exceptions from the user's
//! script are caught by a `try` block, asynchronous ones by `error` and
//! `unhandledrejection` listeners. Both show the overlay with message and
//! stack, and neither reaches the hosting page.
//!
//! ISOLATION
//! =========
//! The document is only delivered inside `<iframe sandbox="allow-scripts">`
//! and, over HTTP, with `Content-Security-Policy: sandbox allow-scripts`.
//! Scripts run; same-origin access, storage, popups and top-level navigation
//! are denied by the browser.

use serde::{Deserialize, Serialize};

/// iframe `sandbox` attribute: scripts only.
pub const SANDBOX_POLICY: &str = "allow-scripts";

/// Response header equivalent of [`SANDBOX_POLICY`].
pub const SANDBOX_CSP: &str = "sandbox allow-scripts";

/// Debounced copy of the three code fields used to build the preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSnapshot {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl PreviewSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.html.is_empty() && self.css.is_empty() && self.js.is_empty()
    }
}

/// What the preview pane should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewDocument {
    /// Nothing to render yet.
    Placeholder,
    /// Full sandboxed HTML document.
    Sandboxed(String),
}

impl PreviewDocument {
    /// Standalone HTML page for this preview. The placeholder renders as a
    /// static explanatory page with no script.
    #[must_use]
    pub fn to_page(&self) -> String {
        match self {
            Self::Placeholder => PLACEHOLDER_PAGE.to_string(),
            Self::Sandboxed(doc) => doc.clone(),
        }
    }

    /// Markup for embedding in the host page: a sandboxed `srcdoc` iframe, or
    /// the placeholder block.
    #[must_use]
    pub fn to_embed(&self) -> String {
        match self {
            Self::Placeholder => PLACEHOLDER_BLOCK.to_string(),
            Self::Sandboxed(doc) => format!(
                r#"<iframe title="Live Preview" sandbox="{SANDBOX_POLICY}" class="preview-frame" aria-label="Live preview of user-provided code" srcdoc="{}"></iframe>"#,
                escape_attribute(doc)
            ),
        }
    }
}

/// Build the preview for a snapshot.
#[must_use]
pub fn render_preview(snapshot: &PreviewSnapshot) -> PreviewDocument {
    if snapshot.is_empty() {
        return PreviewDocument::Placeholder;
    }
    PreviewDocument::Sandboxed(build_document(&snapshot.html, &snapshot.css, &snapshot.js))
}

fn build_document(html: &str, css: &str, js: &str) -> String {
    let js = neutralize_script_close(js);
    let mut doc = String::with_capacity(
        DOC_HEAD.len() + css.len() + DOC_BODY_OPEN.len() + html.len() + DOC_SCRIPT_OPEN.len() + js.len() + 512,
    );
    doc.push_str(DOC_HEAD);
    doc.push_str(css);
    doc.push('\n');
    doc.push_str(OVERLAY_STYLES);
    doc.push_str(DOC_BODY_OPEN);
    doc.push_str(html);
    doc.push('\n');
    doc.push_str(DOC_SCRIPT_OPEN);
    doc.push_str(&js);
    doc.push('\n');
    doc.push_str(DOC_SCRIPT_CLOSE);
    doc
}

/// `</script` inside the boundary script would end it early; the escaped
/// form is equivalent inside JS string and regex literals.
fn neutralize_script_close(js: &str) -> String {
    let lower = js.to_ascii_lowercase();
    let mut out = String::with_capacity(js.len());
    let mut last = 0;
    for (idx, _) in lower.match_indices("</script") {
        out.push_str(&js[last..=idx]);
        out.push('\\');
        last = idx + 1;
    }
    out.push_str(&js[last..]);
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

// =============================================================================
// TEMPLATE
// =============================================================================

const DOC_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<style>
"#;

const OVERLAY_STYLES: &str = r#"#preview-error-overlay {
  position: fixed; top: 10px; left: 10px; right: 10px;
  background-color: #262626; color: #f5f5f5; padding: 1rem;
  font-family: ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, "Liberation Mono", "Courier New", monospace;
  font-size: 0.875rem; z-index: 99999; display: none;
  border: 1px solid #ef4444; border-radius: 8px;
  box-shadow: 0 10px 15px -3px rgb(0 0 0 / 0.1), 0 4px 6px -4px rgb(0 0 0 / 0.1);
  max-height: 40vh; overflow-y: auto;
}
#preview-error-overlay-header {
  display: flex; justify-content: space-between; align-items: center;
  margin-bottom: 0.75rem; padding-bottom: 0.5rem; border-bottom: 1px solid #404040;
}
#preview-error-overlay-header h4 { color: #f87171; font-size: 1rem; font-weight: bold; margin: 0; }
#preview-error-close {
  background: none; border: none; color: #a3a3a3; font-size: 1.5rem;
  line-height: 1; cursor: pointer; padding: 0;
}
#preview-error-close:hover { color: #f5f5f5; }
#preview-error-message { white-space: pre-wrap; word-wrap: break-word; margin: 0; color: #d4d4d4; }
</style>
</head>
"#;

const DOC_BODY_OPEN: &str = r#"<body>
<div id="preview-error-overlay" role="alert">
  <div id="preview-error-overlay-header">
    <h4>JavaScript Error</h4>
    <button id="preview-error-close" aria-label="Close error message">&times;</button>
  </div>
  <pre id="preview-error-message"></pre>
</div>
"#;

const DOC_SCRIPT_OPEN: &str = r"<script>
(() => {
  const overlay = document.getElementById('preview-error-overlay');
  const messageEl = document.getElementById('preview-error-message');
  const closeButton = document.getElementById('preview-error-close');
  if (!overlay || !messageEl || !closeButton) return;

  const withStack = (message, err) =>
    err && err.stack ? message + '\n\nStack Trace:\n' + err.stack : message;
  const showError = (text) => {
    messageEl.textContent = text;
    overlay.style.display = 'block';
  };
  closeButton.onclick = () => { overlay.style.display = 'none'; };

  window.addEventListener('error', (event) => {
    event.preventDefault();
    showError(withStack(event.message || 'An unknown error occurred.', event.error));
  });
  window.addEventListener('unhandledrejection', (event) => {
    event.preventDefault();
    const reason = event.reason;
    const message = reason && reason.message ? reason.message : String(reason);
    showError(withStack('Unhandled promise rejection: ' + message, reason));
  });

  try {
";

const DOC_SCRIPT_CLOSE: &str = r"  } catch (e) {
    showError(withStack(e && e.message ? e.message : String(e), e));
    console.error(e);
  }
})();
</script>
</body>
</html>
";

const PLACEHOLDER_BLOCK: &str = r#"<div class="preview-placeholder">
  <h3>Live Preview</h3>
  <p>Enter some HTML, CSS, or JavaScript on the left to see it rendered here. The preview updates automatically as you type.</p>
</div>"#;

const PLACEHOLDER_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8" />
<style>
body { font-family: system-ui, sans-serif; color: #9ca3af; display: flex; align-items: center; justify-content: center; height: 100vh; margin: 0; text-align: center; }
h3 { color: #d1d5db; }
</style>
</head>
<body>
<div class="preview-placeholder">
  <h3>Live Preview</h3>
  <p>Enter some HTML, CSS, or JavaScript on the left to see it rendered here. The preview updates automatically as you type.</p>
</div>
</body>
</html>
"#;

#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;
