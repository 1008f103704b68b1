//! Pairwise tab similarity scoring.
//!
//! Produces a bounded `[0, 1]` score from weak signals: shared root domain
//! plus application kind, and Jaccard overlap of title and sample token
//! sets. Weights sum to 1.0; the final clamp guards against future weight
//! changes. The function is symmetric and pure.

use std::collections::BTreeSet;

use crate::feature::Feature;

/// Weight for a matching non-empty root domain with the same app kind.
const DOMAIN_KIND_WEIGHT: f64 = 0.5;
/// Weight applied to title-token Jaccard overlap.
const TITLE_WEIGHT: f64 = 0.3;
/// Weight applied to sample-token Jaccard overlap.
const SAMPLE_WEIGHT: f64 = 0.2;

/// Jaccard similarity of two sets: |A ∩ B| / |A ∪ B|, 0 when either is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Weighted similarity of two tab features, clamped to `[0, 1]`.
pub fn similarity(a: &Feature, b: &Feature) -> f64 {
    let mut score = 0.0;
    if !a.root_domain.is_empty() && a.root_domain == b.root_domain && a.app_kind == b.app_kind {
        score += DOMAIN_KIND_WEIGHT;
    }
    score += TITLE_WEIGHT * jaccard(&a.title_tokens, &b.title_tokens);
    score += SAMPLE_WEIGHT * jaccard(&a.sample_tokens, &b.sample_tokens);
    score.min(1.0)
}
