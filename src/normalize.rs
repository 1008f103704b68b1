//! Context event normalization.
//!
//! The single defaulting boundary for inbound captures: malformed tab
//! entries become empty-field defaults, oversized fields are clamped,
//! legacy event names are mapped forward, and an empty tab list is
//! replaced with a placeholder so downstream code can rely on at least
//! one tab being present. After this pass no other module needs to
//! re-validate tab data.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{ContextEvent, Privacy, Signals, Tab};

const MAX_TITLE_CHARS: usize = 300;
const MAX_URL_HASH_CHARS: usize = 64;
const MAX_SAMPLE_CHARS: usize = 4000;
const MAX_ALLOWLIST_ENTRIES: usize = 50;

/// Lenient shape for inbound JSON: tabs stay raw so a malformed entry
/// degrades to defaults instead of failing the whole event.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    ts: String,
    #[serde(default)]
    event: String,
    #[serde(default)]
    active_app: String,
    #[serde(default)]
    correlation_id: Option<String>,
    #[serde(default)]
    active_url_hash: Option<String>,
    #[serde(default)]
    tabs: Vec<Value>,
    #[serde(default)]
    signals: Value,
    #[serde(default)]
    privacy: Value,
    #[serde(default)]
    screenshots: Vec<Value>,
    #[serde(default)]
    ocr_text: String,
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn normalize_tab(value: &Value) -> Tab {
    let mut tab: Tab = serde_json::from_value(value.clone()).unwrap_or_default();
    tab.title = truncate_chars(&tab.title, MAX_TITLE_CHARS);
    tab.url_hash = truncate_chars(&tab.url_hash, MAX_URL_HASH_CHARS);
    tab.text_sample = truncate_chars(&tab.text_sample, MAX_SAMPLE_CHARS);
    tab.ocr_excerpt = truncate_chars(&tab.ocr_excerpt, MAX_SAMPLE_CHARS);
    tab
}

/// Normalize a raw JSON capture into a [`ContextEvent`].
///
/// Never fails: unknown fields are ignored, missing fields get defaults,
/// and non-object tab entries are dropped.
pub fn normalize_event(value: Value) -> ContextEvent {
    let raw: RawEvent = serde_json::from_value(value).unwrap_or_default();

    let mut event_kind = raw.event;
    // Legacy emitters used "auto_capture" for what is now "periodic".
    if event_kind.eq_ignore_ascii_case("auto_capture") {
        event_kind = "periodic".to_string();
    }
    if event_kind.is_empty() {
        event_kind = "manual_capture".to_string();
    }

    let mut tabs: Vec<Tab> = raw
        .tabs
        .iter()
        .filter(|v| v.is_object())
        .map(normalize_tab)
        .collect();

    let active_app = if raw.active_app.is_empty() {
        "chrome".to_string()
    } else {
        raw.active_app
    };

    // The clustering core requires at least one tab.
    if tabs.is_empty() {
        tabs.push(Tab {
            title: active_app.clone(),
            ..Default::default()
        });
    }

    let mut signals: Signals = serde_json::from_value(raw.signals).unwrap_or_default();
    signals.idle_sec = signals.idle_sec.max(0);

    let mut privacy: Privacy = serde_json::from_value(raw.privacy).unwrap_or_default();
    privacy.allowlist.truncate(MAX_ALLOWLIST_ENTRIES);

    let screenshots = raw
        .screenshots
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();

    let user_id = if raw.user_id.is_empty() {
        "dev-user".to_string()
    } else {
        raw.user_id
    };

    ContextEvent {
        user_id,
        ts: raw.ts,
        event: event_kind,
        active_app,
        correlation_id: raw.correlation_id.filter(|c| !c.is_empty()),
        active_url_hash: raw.active_url_hash.filter(|h| !h.is_empty()),
        tabs,
        signals,
        privacy,
        screenshots,
        ocr_text: raw.ocr_text,
    }
}
