//! Core data models used throughout Activity Lens.
//!
//! These types represent the context events, tabs, summaries, and activities
//! that flow through the clustering and summarization pipeline.

use serde::{Deserialize, Serialize};

/// A single browser tab inside a context event.
///
/// All fields default to empty so partially-populated captures from older
/// extension versions deserialize cleanly; clamping happens in
/// [`crate::normalize`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default)]
    pub title: String,
    /// Full URL when the capture is unredacted; otherwise absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// SHA-256 hex digest of the URL; the stable tab identity.
    #[serde(default)]
    pub url_hash: String,
    /// Visible-text excerpt captured from the page.
    #[serde(default)]
    pub text_sample: String,
    /// OCR text extracted from a screenshot of this tab, if any.
    #[serde(default)]
    pub ocr_excerpt: String,
}

impl Tab {
    /// The string used for URL-derived features: the real URL when present,
    /// otherwise the hash (which never parses as a URL and yields no domain).
    pub fn url_or_hash(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.url_hash)
    }
}

/// Ambient signals captured alongside the tab list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signals {
    #[serde(default)]
    pub idle_sec: i64,
    #[serde(default)]
    pub calendar_busy: bool,
    #[serde(default)]
    pub slack_ping: bool,
}

/// Privacy settings attached to a capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Privacy {
    #[serde(default = "default_redacted")]
    pub redacted: bool,
    #[serde(default)]
    pub allowlist: Vec<String>,
}

fn default_redacted() -> bool {
    true
}

impl Default for Privacy {
    fn default() -> Self {
        Self {
            redacted: true,
            allowlist: Vec::new(),
        }
    }
}

/// A screenshot as sent by the capture client: base64 payload plus MIME type.
///
/// Accepts both the current `dataBase64` key and the legacy `data_base64`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotPayload {
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default, alias = "dataBase64")]
    pub data_base64: String,
}

fn default_mime() -> String {
    "image/png".to_string()
}

/// A validated screenshot ready to attach to a summarizer call.
///
/// The base64 payload is kept as-is (the Messages API wants base64);
/// decoded bytes are only materialized for size validation.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub mime: String,
    pub b64: String,
}

/// A normalized context event: one snapshot of the user's browser state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextEvent {
    #[serde(default)]
    pub user_id: String,
    /// ISO-8601 capture timestamp, as supplied by the client.
    #[serde(default)]
    pub ts: String,
    /// Capture kind: `manual_capture`, `periodic`, or `tab_switch`.
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub active_app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Hash of the currently focused tab's URL, when the client knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_url_hash: Option<String>,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub signals: Signals,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<ScreenshotPayload>,
    /// Pre-merged OCR text supplied by an upstream OCR collaborator.
    #[serde(default)]
    pub ocr_text: String,
}

/// A suggested follow-up action attached to a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextAction {
    pub action: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<u32>,
}

impl NextAction {
    pub fn open_tab(target_url_hash: &str) -> Self {
        Self {
            action: "open_tab".to_string(),
            label: "Reopen last tab".to_string(),
            target_url_hash: Some(target_url_hash.to_string()),
            duration_min: None,
        }
    }

    pub fn focus_timer() -> Self {
        Self {
            action: "start_timer".to_string(),
            label: "Start 25-min focus timer".to_string(),
            target_url_hash: None,
            duration_min: Some(25),
        }
    }
}

/// Output of the summarizer collaborator for one tab cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub correlation_id: String,
    pub summary: String,
    pub next_actions: Vec<NextAction>,
    pub confidence: f64,
}

/// A ranked, labeled group of tabs believed to represent one coherent task.
///
/// Created fresh per request from a cluster plus summarizer output; `rank`
/// is assigned once, after the global sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: String,
    pub label: String,
    pub tab_count: usize,
    pub is_active: bool,
    pub summary: String,
    pub next_actions: Vec<NextAction>,
    pub confidence: f64,
    pub tab_hashes: Vec<String>,
    pub rank: i64,
}

/// Response body for a processed context event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub primary_activity_id: Option<String>,
    pub activities: Vec<Activity>,
}
