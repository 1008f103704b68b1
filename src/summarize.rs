//! Summarizer collaborator abstraction and implementations.
//!
//! Defines the [`Summarizer`] trait and concrete implementations:
//! - **[`StubSummarizer`]** — deterministic local summaries; used when no
//!   hosted model is configured and as the degrade target when a hosted
//!   call fails.
//! - **[`AnthropicSummarizer`]** — calls the Anthropic Messages API with
//!   retry and backoff; supports a text-only prompt and a multimodal
//!   prompt carrying base64 screenshots.
//!
//! Provider failures never abort a request: the pipeline catches errors
//! and substitutes [`stub_summary`] / the local label heuristic.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::{PipelineConfig, SummarizerConfig};
use crate::models::{NextAction, Screenshot, SessionSummary, Tab};
use crate::normalize::truncate_chars;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Everything a summarizer needs to describe one tab cluster.
#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    pub user_id: String,
    pub event: String,
    /// Client correlation id; the pipeline forwards it to at most one
    /// cluster per capture so activity ids stay unique.
    pub correlation_id: Option<String>,
    pub active_url_hash: String,
    pub tabs: Vec<Tab>,
    /// Merged OCR text for the whole capture, if an OCR collaborator ran.
    pub ocr_text: String,
    pub images: Vec<Screenshot>,
}

/// A collaborator that turns a tab cluster into a [`SessionSummary`] and
/// can also produce short activity labels.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider identifier (e.g. `"stub"`, `"anthropic"`).
    fn provider_name(&self) -> &str;

    /// Summarize one cluster. Errors are expected and handled by the
    /// caller, which degrades to [`stub_summary`].
    async fn summarize(&self, request: &SummarizeRequest) -> Result<SessionSummary>;

    /// Produce a very short (2–4 word) Title-Case label for free text.
    async fn label(&self, text: &str) -> Result<String>;
}

/// Instantiate the summarizer named in the configuration.
pub fn create_summarizer(
    config: &SummarizerConfig,
    pipeline: &PipelineConfig,
) -> Result<Box<dyn Summarizer>> {
    match config.provider.as_str() {
        "stub" => Ok(Box::new(StubSummarizer)),
        "anthropic" => Ok(Box::new(AnthropicSummarizer::new(config, pipeline)?)),
        other => bail!("Unknown summarizer provider: {}", other),
    }
}

// ============ Stub summarizer ============

/// Deterministic local summarizer used in development and as the degrade
/// target for hosted-model failures.
pub struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    fn provider_name(&self) -> &str {
        "stub"
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SessionSummary> {
        Ok(stub_summary(request))
    }

    async fn label(&self, text: &str) -> Result<String> {
        Ok(crate::label::heuristic_label(text))
    }
}

/// Build a deterministic summary from the active (or first) tab's title and
/// text sample. Always succeeds; used directly by [`StubSummarizer`] and as
/// the fallback when a hosted provider errors out.
pub fn stub_summary(request: &SummarizeRequest) -> SessionSummary {
    let active = request
        .tabs
        .iter()
        .find(|t| t.url_hash == request.active_url_hash)
        .or_else(|| request.tabs.first());

    let title = active
        .map(|t| t.title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or("Current tab");

    let mut sample = active
        .map(|t| truncate_chars(&t.text_sample, 140))
        .unwrap_or_default();
    if !request.ocr_text.is_empty() {
        sample = format!("{} {}", sample, truncate_chars(&request.ocr_text, 160))
            .trim()
            .to_string();
    }

    let mut text = format!("On \"{}\".", title);
    if !sample.is_empty() {
        text.push_str(&format!(" Working with: {}", sample));
    }

    // The reopen action must point at a member of this cluster: the active
    // tab when it belongs here, otherwise the cluster's first tab.
    let target_hash = active.map(|t| t.url_hash.clone()).unwrap_or_default();

    SessionSummary {
        correlation_id: request
            .correlation_id
            .clone()
            .unwrap_or_else(fresh_correlation_id),
        summary: text.trim().to_string(),
        next_actions: vec![NextAction::open_tab(&target_hash), NextAction::focus_timer()],
        confidence: 0.7,
    }
}

fn fresh_correlation_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("c-{}", &hex[..8])
}

// ============ Anthropic summarizer ============

/// Summarizer backed by the Anthropic Messages API.
///
/// Requires the `ANTHROPIC_API_KEY` environment variable. Prompts ask for
/// strict JSON; responses are recovered tolerantly via
/// [`extract_json_object`] since models occasionally wrap output in prose
/// or markdown fences.
pub struct AnthropicSummarizer {
    model: String,
    max_retries: u32,
    timeout_secs: u64,
    max_tabs_per_prompt: usize,
    max_images: usize,
}

impl AnthropicSummarizer {
    pub fn new(config: &SummarizerConfig, pipeline: &PipelineConfig) -> Result<Self> {
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            bail!("ANTHROPIC_API_KEY environment variable not set");
        }
        Ok(Self {
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
            max_tabs_per_prompt: pipeline.max_tabs_per_prompt,
            max_images: pipeline.max_images,
        })
    }

    fn tab_lines(&self, request: &SummarizeRequest) -> Vec<String> {
        let mut lines = Vec::new();
        for tab in request.tabs.iter().take(self.max_tabs_per_prompt) {
            let id = if tab.url_hash.is_empty() {
                tab.url_or_hash()
            } else {
                tab.url_hash.as_str()
            };
            let mut line = format!("- [{}] {}", id, tab.title);
            if !tab.text_sample.is_empty() {
                line.push_str(&format!(" :: {}", truncate_chars(&tab.text_sample, 300)));
            }
            if !tab.ocr_excerpt.is_empty() {
                line.push_str(&format!(" :: {}", truncate_chars(&tab.ocr_excerpt, 300)));
            }
            lines.push(line);
        }
        if !request.ocr_text.is_empty() {
            lines.push("\n[OCR MERGED]".to_string());
            lines.push(truncate_chars(&request.ocr_text, 2000));
        }
        lines
    }

    fn text_prompt(&self, request: &SummarizeRequest) -> String {
        let mut lines = vec![
            "You are a productivity assistant. Summarize what the user is working on from recent browser context:".to_string(),
            format!("- user_id: {}", request.user_id),
            format!("- active_url_hash: {}", request.active_url_hash),
            "- tabs:".to_string(),
        ];
        lines.extend(self.tab_lines(request));
        lines.push(
            "\nReturn STRICT JSON with keys: correlation_id, summary, next_actions (array of 2 items), confidence (0..1)."
                .to_string(),
        );
        lines.join("\n")
    }

    /// Anthropic `messages[].content` blocks combining tab text with up to
    /// `max_images` base64 screenshots.
    fn vision_blocks(&self, request: &SummarizeRequest) -> Vec<Value> {
        let mut text_parts = vec!["Tabs/context:".to_string()];
        text_parts.extend(self.tab_lines(request));

        let mut blocks = vec![json!({"type": "text", "text": text_parts.join("\n")})];
        for image in request.images.iter().take(self.max_images) {
            blocks.push(json!({
                "type": "image",
                "source": {"type": "base64", "media_type": image.mime, "data": image.b64}
            }));
        }
        blocks
    }

    /// Call the Messages API with retry/backoff and return the first text
    /// block of the response.
    async fn invoke(&self, body: Value) -> Result<String> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return first_text_block(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Anthropic API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Anthropic API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Summarization failed after retries")))
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SessionSummary> {
        let body = if request.images.is_empty() {
            json!({
                "model": self.model,
                "max_tokens": 256,
                "temperature": 0.2,
                "messages": [{"role": "user", "content": [
                    {"type": "text", "text": self.text_prompt(request)}
                ]}],
            })
        } else {
            json!({
                "model": self.model,
                "max_tokens": 512,
                "temperature": 0.2,
                "system": "You summarize the user's active work context from browser tabs and screenshots. \
                    Return STRICT JSON with keys: correlation_id, summary, next_actions (array of 2), confidence (0..1). \
                    Keep the summary short, one sentence.",
                "messages": [{"role": "user", "content": self.vision_blocks(request)}],
            })
        };

        let raw = self.invoke(body).await?;
        let obj = extract_json_object(&raw)
            .ok_or_else(|| anyhow::anyhow!("model response contained no JSON object"))?;
        Ok(summary_from_value(&obj, request))
    }

    async fn label(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "Create a very short label (2-4 words, Title Case, no punctuation) for this task context.\n\
             Return strictly JSON: {{\"label\": \"...\"}}\n\nCONTEXT:\n{}",
            truncate_chars(text, 2000)
        );
        let body = json!({
            "model": self.model,
            "max_tokens": 64,
            "temperature": 0.2,
            "messages": [{"role": "user", "content": [{"type": "text", "text": prompt}]}],
        });

        let raw = self.invoke(body).await?;
        let label = match extract_json_object(&raw) {
            Some(obj) => obj
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            None => raw.lines().next().unwrap_or_default().trim().to_string(),
        };
        if label.is_empty() {
            bail!("model returned an empty label");
        }
        Ok(label)
    }
}

/// Extract the first text block from a Messages API response.
fn first_text_block(json: &Value) -> Result<String> {
    let blocks = json
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("Invalid Anthropic response: missing content array"))?;

    for block in blocks {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    return Ok(text.trim().to_string());
                }
            }
        }
    }
    bail!("Invalid Anthropic response: no text block")
}

/// Try to parse a JSON object from model output that may include extra
/// prose or markdown fences: direct parse first, then a ```json fence,
/// then the first balanced `{...}` blob.
pub fn extract_json_object(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(rest[..end].trim()) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }

    first_balanced_object(text)
        .and_then(|blob| serde_json::from_str::<Value>(blob).ok())
        .filter(Value::is_object)
}

/// Scan for the first balanced `{...}` region, tracking string literals so
/// braces inside quoted values don't confuse the depth count.
fn first_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Sanitize a parsed model object into a [`SessionSummary`], filling
/// defaults for anything missing or malformed.
fn summary_from_value(obj: &Value, request: &SummarizeRequest) -> SessionSummary {
    let fallback = stub_summary(request);

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let title = request
                .tabs
                .first()
                .map(|t| t.title.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or("Current tab");
            format!("On \"{}\".", title)
        });

    let mut next_actions: Vec<NextAction> = obj
        .get("next_actions")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_else(|| fallback.next_actions.clone());
    if next_actions.len() < 2 {
        next_actions.push(NextAction::focus_timer());
    }

    let confidence = match obj.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.7),
        Some(Value::String(s)) => s.parse().unwrap_or(0.7),
        _ => 0.7,
    };

    let correlation_id = obj
        .get("correlation_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or(fallback.correlation_id);

    SessionSummary {
        correlation_id,
        summary,
        next_actions,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SummarizeRequest {
        SummarizeRequest {
            user_id: "dev-user".to_string(),
            event: "manual_capture".to_string(),
            correlation_id: Some("c-fixed123".to_string()),
            active_url_hash: "hash-b".to_string(),
            tabs: vec![
                Tab {
                    title: "Q3 Plan".to_string(),
                    url_hash: "hash-a".to_string(),
                    text_sample: "budget draft".to_string(),
                    ..Default::default()
                },
                Tab {
                    title: "Revenue model".to_string(),
                    url_hash: "hash-b".to_string(),
                    text_sample: "projection sheet".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn stub_prefers_active_tab_and_is_deterministic() {
        let req = request();
        let first = stub_summary(&req);
        let second = stub_summary(&req);
        assert_eq!(first.correlation_id, "c-fixed123");
        assert!(first.summary.contains("Revenue model"));
        assert!(first.summary.contains("projection sheet"));
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.next_actions.len(), 2);
        assert_eq!(first.next_actions[0].action, "open_tab");
        assert_eq!(
            first.next_actions[0].target_url_hash.as_deref(),
            Some("hash-b")
        );
        assert_eq!(first.confidence, 0.7);
    }

    #[test]
    fn stub_falls_back_to_first_tab() {
        let mut req = request();
        req.active_url_hash = "missing".to_string();
        let summary = stub_summary(&req);
        assert!(summary.summary.contains("Q3 Plan"));
    }

    #[test]
    fn inactive_cluster_actions_target_member_tab() {
        // Active tab lives in another cluster; the reopen action must not
        // point outside this one.
        let mut req = request();
        req.active_url_hash = "hash-elsewhere".to_string();
        let summary = stub_summary(&req);
        assert_eq!(
            summary.next_actions[0].target_url_hash.as_deref(),
            Some("hash-a")
        );
    }

    #[test]
    fn extract_direct_json() {
        let obj = extract_json_object(r#"{"summary": "working"}"#).unwrap();
        assert_eq!(obj["summary"], "working");
    }

    #[test]
    fn extract_fenced_json() {
        let text = "Here you go:\n```json\n{\"summary\": \"fenced\"}\n```\nDone.";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["summary"], "fenced");
    }

    #[test]
    fn extract_embedded_object_with_braces_in_strings() {
        let text = r#"The result is {"summary": "uses { and } inside", "confidence": 0.9} as requested."#;
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["confidence"], 0.9);
    }

    #[test]
    fn extract_returns_none_for_prose() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn summary_from_value_fills_defaults() {
        let req = request();
        let obj = serde_json::json!({"summary": "  deep in spreadsheets  "});
        let summary = summary_from_value(&obj, &req);
        assert_eq!(summary.summary, "deep in spreadsheets");
        assert_eq!(summary.correlation_id, "c-fixed123");
        assert_eq!(summary.confidence, 0.7);
        assert!(summary.next_actions.len() >= 2);
    }

    #[test]
    fn summary_from_value_parses_string_confidence() {
        let req = request();
        let obj = serde_json::json!({"summary": "x", "confidence": "0.85"});
        let summary = summary_from_value(&obj, &req);
        assert_eq!(summary.confidence, 0.85);
    }

    #[test]
    fn summary_from_value_pads_single_action() {
        let req = request();
        let obj = serde_json::json!({
            "summary": "x",
            "next_actions": [{"action": "open_tab", "label": "Back to work"}]
        });
        let summary = summary_from_value(&obj, &req);
        assert_eq!(summary.next_actions.len(), 2);
        assert_eq!(summary.next_actions[1].action, "start_timer");
    }
}
