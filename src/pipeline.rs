//! The clustering, assembly, and ranking pipeline.
//!
//! Turns a normalized [`ContextEvent`] into a ranked activity list:
//! cluster the tabs, summarize and label each cluster through the
//! summarizer collaborator (degrading to local fallbacks on failure),
//! then sort active-first / largest-first and assign ranks.
//!
//! The pipeline is pure computation between the two collaborator calls per
//! cluster; it holds no state beyond a single invocation.

use crate::cluster::cluster_tabs;
use crate::config::PipelineConfig;
use crate::label::{heuristic_label, sanitize_label};
use crate::models::{Activity, ContextEvent, IngestResponse, Screenshot, SessionSummary};
use crate::normalize::truncate_chars;
use crate::screenshot::normalize_screenshots;
use crate::summarize::{stub_summary, SummarizeRequest, Summarizer};

/// Index of the currently focused tab: the first tab whose hash matches
/// the explicit active hash, else 0.
pub fn active_tab_index(event: &ContextEvent) -> usize {
    let active_hash = event
        .active_url_hash
        .clone()
        .or_else(|| event.tabs.first().map(|t| t.url_hash.clone()))
        .unwrap_or_default();

    if active_hash.is_empty() {
        return 0;
    }
    event
        .tabs
        .iter()
        .position(|t| t.url_hash == active_hash)
        .unwrap_or(0)
}

/// Stable sort by `(!is_active, tab_count desc)` and assign 0-based ranks.
///
/// Equal keys preserve the relative order the clustering engine produced.
pub fn rank_activities(activities: &mut [Activity]) {
    activities.sort_by_key(|a| (!a.is_active, std::cmp::Reverse(a.tab_count)));
    for (position, activity) in activities.iter_mut().enumerate() {
        activity.rank = position as i64;
    }
}

/// Summarize one cluster, degrading to the local stub when the
/// collaborator fails.
async fn summarize_or_stub(
    summarizer: &dyn Summarizer,
    request: &SummarizeRequest,
) -> SessionSummary {
    match summarizer.summarize(request).await {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!(
                "summarizer ({}) failed, using local stub: {}",
                summarizer.provider_name(),
                err
            );
            stub_summary(request)
        }
    }
}

/// Label one cluster, degrading to the token heuristic when the
/// collaborator fails or returns nothing usable.
async fn label_or_heuristic(summarizer: &dyn Summarizer, text: &str) -> String {
    match summarizer.label(text).await {
        Ok(raw) if !raw.trim().is_empty() => sanitize_label(&raw),
        _ => heuristic_label(text),
    }
}

/// Run the full pipeline on a normalized event.
///
/// The event must carry at least one tab, which [`crate::normalize`]
/// guarantees. Clusters are processed sequentially; collaborator failures
/// degrade per-cluster rather than aborting the request.
pub async fn process_event(
    event: &ContextEvent,
    config: &PipelineConfig,
    summarizer: &dyn Summarizer,
) -> IngestResponse {
    let images: Vec<Screenshot> = normalize_screenshots(&event.screenshots, config.max_images);

    let active_idx = active_tab_index(event);
    let clusters = cluster_tabs(&event.tabs, config.similarity_threshold);

    let mut activities = Vec::with_capacity(clusters.len());

    for indices in &clusters {
        let member_tabs: Vec<_> = indices.iter().map(|&i| event.tabs[i].clone()).collect();
        let is_active = indices.contains(&active_idx);

        // A client correlation id follows the active cluster only; every
        // other cluster mints its own, so activity ids stay unique within
        // one response.
        let correlation_id = if is_active {
            event.correlation_id.clone()
        } else {
            None
        };

        let request = SummarizeRequest {
            user_id: event.user_id.clone(),
            event: event.event.clone(),
            correlation_id,
            active_url_hash: event.active_url_hash.clone().unwrap_or_default(),
            tabs: member_tabs.clone(),
            ocr_text: event.ocr_text.clone(),
            images: images.clone(),
        };

        let summary = summarize_or_stub(summarizer, &request).await;

        let label_source = format!(
            "{} {}",
            member_tabs
                .iter()
                .map(|t| t.title.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            summary.summary
        );
        let label = label_or_heuristic(summarizer, &label_source).await;

        activities.push(Activity {
            activity_id: summary.correlation_id,
            label,
            tab_count: member_tabs.len(),
            is_active,
            summary: truncate_chars(&summary.summary, config.summary_max_chars),
            next_actions: summary.next_actions,
            confidence: summary.confidence.clamp(0.0, 1.0),
            tab_hashes: member_tabs.iter().map(|t| t.url_hash.clone()).collect(),
            rank: 0,
        });
    }

    rank_activities(&mut activities);

    IngestResponse {
        ok: true,
        primary_activity_id: activities.first().map(|a| a.activity_id.clone()),
        activities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NextAction, Tab};
    use crate::summarize::StubSummarizer;
    use anyhow::bail;
    use async_trait::async_trait;

    fn activity(is_active: bool, tab_count: usize, id: &str) -> Activity {
        Activity {
            activity_id: id.to_string(),
            label: String::new(),
            tab_count,
            is_active,
            summary: String::new(),
            next_actions: vec![],
            confidence: 0.7,
            tab_hashes: vec![],
            rank: 0,
        }
    }

    #[test]
    fn ranking_is_active_first_then_size_then_stable() {
        let mut activities = vec![
            activity(false, 2, "a"),
            activity(true, 1, "b"),
            activity(false, 5, "c"),
        ];
        rank_activities(&mut activities);
        let ids: Vec<_> = activities.iter().map(|a| a.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        let ranks: Vec<_> = activities.iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn ranking_ties_preserve_input_order() {
        let mut activities = vec![
            activity(false, 3, "first"),
            activity(false, 3, "second"),
            activity(false, 3, "third"),
        ];
        rank_activities(&mut activities);
        let ids: Vec<_> = activities.iter().map(|a| a.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    fn event_with_tabs(tabs: Vec<Tab>) -> ContextEvent {
        ContextEvent {
            user_id: "dev-user".to_string(),
            event: "manual_capture".to_string(),
            tabs,
            ..Default::default()
        }
    }

    fn tab(title: &str, url: &str, hash: &str, sample: &str) -> Tab {
        Tab {
            title: title.to_string(),
            url: Some(url.to_string()),
            url_hash: hash.to_string(),
            text_sample: sample.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn process_event_groups_and_ranks() {
        let mut event = event_with_tabs(vec![
            tab("PR #12", "https://github.com/org/repo/pull/12", "h1", "diff"),
            tab("Q3 Plan", "https://docs.google.com/document/d/1", "h2", "budget"),
            tab("Q3 Plan notes", "https://docs.google.com/document/d/2", "h3", "budget"),
        ]);
        event.active_url_hash = Some("h1".to_string());

        let config = PipelineConfig::default();
        let response = process_event(&event, &config, &StubSummarizer).await;

        assert!(response.ok);
        assert_eq!(response.activities.len(), 2);
        // The active singleton outranks the larger inactive docs cluster.
        assert!(response.activities[0].is_active);
        assert_eq!(response.activities[0].tab_count, 1);
        assert_eq!(response.activities[0].tab_hashes, vec!["h1"]);
        assert_eq!(response.activities[1].tab_count, 2);
        assert_eq!(response.activities[1].tab_hashes, vec!["h2", "h3"]);
        assert_eq!(
            response.primary_activity_id.as_deref(),
            Some(response.activities[0].activity_id.as_str())
        );
        for activity in &response.activities {
            assert!(!activity.label.is_empty());
            assert!((0.0..=1.0).contains(&activity.confidence));
        }
    }

    #[tokio::test]
    async fn single_tab_event_yields_one_activity() {
        let event = event_with_tabs(vec![tab("Only", "https://example.com", "h1", "")]);
        let config = PipelineConfig::default();
        let response = process_event(&event, &config, &StubSummarizer).await;
        assert_eq!(response.activities.len(), 1);
        assert!(response.activities[0].is_active);
        assert_eq!(response.activities[0].rank, 0);
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        fn provider_name(&self) -> &str {
            "failing"
        }
        async fn summarize(&self, _request: &SummarizeRequest) -> anyhow::Result<SessionSummary> {
            bail!("connection reset")
        }
        async fn label(&self, _text: &str) -> anyhow::Result<String> {
            bail!("connection reset")
        }
    }

    #[tokio::test]
    async fn collaborator_failure_degrades_to_local_fallbacks() {
        let event = event_with_tabs(vec![tab(
            "Quarterly Revenue Report Draft",
            "https://docs.google.com/document/d/1",
            "h1",
            "numbers",
        )]);
        let config = PipelineConfig::default();
        let response = process_event(&event, &config, &FailingSummarizer).await;

        assert_eq!(response.activities.len(), 1);
        let activity = &response.activities[0];
        // Stub summary and heuristic label stand in for the failed collaborator.
        assert!(activity.summary.contains("Quarterly Revenue Report Draft"));
        assert_eq!(activity.label, "Quarterly Revenue Report");
        assert_eq!(activity.next_actions.len(), 2);
    }

    #[tokio::test]
    async fn confidence_outside_range_is_clamped() {
        struct OverconfidentSummarizer;

        #[async_trait]
        impl Summarizer for OverconfidentSummarizer {
            fn provider_name(&self) -> &str {
                "overconfident"
            }
            async fn summarize(&self, req: &SummarizeRequest) -> anyhow::Result<SessionSummary> {
                Ok(SessionSummary {
                    correlation_id: "c-over".to_string(),
                    summary: "sure of it".to_string(),
                    next_actions: vec![NextAction::focus_timer(), NextAction::focus_timer()],
                    confidence: 1.8,
                })
                .map(|mut s| {
                    s.correlation_id = req
                        .correlation_id
                        .clone()
                        .unwrap_or_else(|| "c-over".to_string());
                    s
                })
            }
            async fn label(&self, _text: &str) -> anyhow::Result<String> {
                Ok("Sure Thing".to_string())
            }
        }

        let event = event_with_tabs(vec![tab("x", "https://example.com", "h1", "")]);
        let config = PipelineConfig::default();
        let response = process_event(&event, &config, &OverconfidentSummarizer).await;
        assert_eq!(response.activities[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn client_correlation_id_stays_unique_per_activity() {
        let mut event = event_with_tabs(vec![
            tab("PR #12", "https://github.com/org/repo/pull/12", "h1", "diff"),
            tab("Re: invoice", "https://mail.google.com/mail/u/0", "h2", "payment"),
        ]);
        event.correlation_id = Some("c-client99".to_string());
        event.active_url_hash = Some("h1".to_string());

        let config = PipelineConfig::default();
        let response = process_event(&event, &config, &StubSummarizer).await;

        assert_eq!(response.activities.len(), 2);
        assert_ne!(
            response.activities[0].activity_id,
            response.activities[1].activity_id
        );
        // The client id sticks to the active activity; the other mints its own.
        assert_eq!(response.activities[0].activity_id, "c-client99");
        assert!(response.activities[1].activity_id.starts_with("c-"));
        assert_eq!(
            response.primary_activity_id.as_deref(),
            Some("c-client99")
        );
    }

    #[test]
    fn active_index_prefers_explicit_hash() {
        let mut event = event_with_tabs(vec![
            tab("a", "https://a.com", "h1", ""),
            tab("b", "https://b.com", "h2", ""),
        ]);
        assert_eq!(active_tab_index(&event), 0);
        event.active_url_hash = Some("h2".to_string());
        assert_eq!(active_tab_index(&event), 1);
        event.active_url_hash = Some("missing".to_string());
        assert_eq!(active_tab_index(&event), 0);
    }
}
