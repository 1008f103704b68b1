//! Feature extraction for tab similarity scoring.
//!
//! Converts each raw [`Tab`] into a comparable [`Feature`] tuple: root
//! domain, application kind, and token sets over the title and text sample.
//! Extraction is pure and order-preserving (`Feature.index` equals the tab's
//! position in the input); malformed URLs degrade to an empty root domain
//! rather than erroring.

use std::collections::BTreeSet;

use url::Url;

use crate::models::Tab;

/// Stop words dropped during tokenization.
const STOP_WORDS: &[&str] = &[
    "the", "and", "a", "an", "to", "of", "for", "in", "on", "with", "your", "you",
];

/// Coarse application classification derived from a tab's URL and title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    GDocs,
    GSheets,
    GSlides,
    Wiki,
    Gmail,
    Web,
}

/// Derived, ephemeral attributes of one tab; exists only for the duration
/// of a single clustering pass.
#[derive(Debug, Clone)]
pub struct Feature {
    pub index: usize,
    pub root_domain: String,
    pub app_kind: AppKind,
    pub title_tokens: BTreeSet<String>,
    pub sample_tokens: BTreeSet<String>,
}

/// Extract maximal lowercase `[a-z0-9]` runs of length >= 2, minus stop
/// words, preserving first-seen order with duplicates removed.
pub fn token_list(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tokens = Vec::new();
    let mut seen = BTreeSet::new();
    let mut run = String::new();

    for ch in lower.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            run.push(ch);
            continue;
        }
        if run.len() >= 2 && !STOP_WORDS.contains(&run.as_str()) && seen.insert(run.clone()) {
            tokens.push(run.clone());
        }
        run.clear();
    }
    tokens
}

/// Tokenize into an unordered set, for Jaccard comparisons.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    token_list(text).into_iter().collect()
}

/// The last two dot-separated labels of the URL's hostname, or the whole
/// hostname if it has fewer; empty string when the URL does not parse or
/// has no hostname. Never fails.
pub fn root_domain(url: &str) -> String {
    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_string).unwrap_or_default(),
        Err(_) => String::new(),
    };
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2..].join(".")
    } else {
        host
    }
}

/// First-match classification over a fixed rule list; order is significant.
pub fn app_kind(url: &str, title: &str) -> AppKind {
    let title = title.to_lowercase();
    if url.contains("docs.google.com") {
        AppKind::GDocs
    } else if url.contains("spreadsheets") || url.contains("sheets") {
        AppKind::GSheets
    } else if url.contains("presentation") || url.contains("slides") {
        AppKind::GSlides
    } else if url.contains("wikipedia.org") {
        AppKind::Wiki
    } else if url.contains("mail.google.com") || title.contains("gmail") {
        AppKind::Gmail
    } else {
        AppKind::Web
    }
}

/// Build one [`Feature`] per tab, in input order.
pub fn featurize(tabs: &[Tab]) -> Vec<Feature> {
    tabs.iter()
        .enumerate()
        .map(|(index, tab)| {
            let url = tab.url_or_hash();
            let sample = format!("{} {}", tab.text_sample, tab.ocr_excerpt);
            Feature {
                index,
                root_domain: root_domain(url),
                app_kind: app_kind(url, &tab.title),
                title_tokens: tokenize(&tab.title),
                sample_tokens: tokenize(&sample),
            }
        })
        .collect()
}
