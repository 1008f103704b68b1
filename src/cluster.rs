//! Single-link tab clustering over a similarity threshold.
//!
//! Groups tab indices into connected components with an index-based
//! union-find (parent array, path compression). Every unordered pair is
//! compared in ascending `(i, j)` order, so a given tab list always
//! produces the same partition. Clusters are identified by their member
//! index sets, never by which union-find root happened to survive.
//!
//! Complexity is O(n²) comparisons, which is fine for a browsing session
//! of at most tens of tabs.

use std::collections::HashMap;

use crate::feature::{featurize, Feature};
use crate::models::Tab;
use crate::similarity::similarity;

/// Index-based disjoint-set structure.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Find the set representative for `x`, halving paths along the way.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Cluster pre-computed features; returns clusters of original indices.
///
/// Each cluster's indices are ascending; clusters appear in order of their
/// smallest member index. The output partitions `[0, n)` exactly.
pub fn cluster_features(features: &[Feature], threshold: f64) -> Vec<Vec<usize>> {
    let n = features.len();
    let mut uf = UnionFind::new(n);

    for i in 0..n {
        for j in (i + 1)..n {
            if similarity(&features[i], &features[j]) >= threshold {
                uf.union(i, j);
            }
        }
    }

    // Bucket by root, keeping clusters ordered by first appearance.
    let mut order: Vec<usize> = Vec::new();
    let mut buckets: HashMap<usize, Vec<usize>> = HashMap::new();
    for idx in 0..n {
        let root = uf.find(idx);
        buckets.entry(root).or_insert_with(|| {
            order.push(root);
            Vec::new()
        });
        if let Some(members) = buckets.get_mut(&root) {
            members.push(idx);
        }
    }

    order.into_iter().map(|root| buckets.remove(&root).unwrap_or_default()).collect()
}

/// Cluster raw tabs at the given similarity threshold.
///
/// Callers must supply at least one tab (the ingest boundary inserts a
/// placeholder when a capture has none). A single tab yields one singleton
/// cluster with no comparisons performed.
pub fn cluster_tabs(tabs: &[Tab], threshold: f64) -> Vec<Vec<usize>> {
    if tabs.is_empty() {
        return Vec::new();
    }
    if tabs.len() == 1 {
        return vec![vec![0]];
    }
    cluster_features(&featurize(tabs), threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tab;

    const THRESHOLD: f64 = 0.55;

    fn tab(title: &str, url: &str, sample: &str) -> Tab {
        Tab {
            title: title.to_string(),
            url: Some(url.to_string()),
            text_sample: sample.to_string(),
            ..Default::default()
        }
    }

    fn assert_partition(clusters: &[Vec<usize>], n: usize) {
        let mut seen = vec![false; n];
        for cluster in clusters {
            assert!(!cluster.is_empty(), "empty cluster");
            for &idx in cluster {
                assert!(!seen[idx], "index {} appears twice", idx);
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "partition does not cover all indices");
    }

    #[test]
    fn singleton_input_yields_single_cluster() {
        let tabs = vec![tab("Only", "https://example.com", "")];
        assert_eq!(cluster_tabs(&tabs, THRESHOLD), vec![vec![0]]);
    }

    #[test]
    fn identical_domain_kind_and_title_cluster_together() {
        let tabs = vec![
            tab("Q3 Plan", "https://docs.google.com/document/d/1", ""),
            tab("Q3 Plan", "https://docs.google.com/document/d/2", ""),
        ];
        let clusters = cluster_tabs(&tabs, THRESHOLD);
        assert_eq!(clusters, vec![vec![0, 1]]);
    }

    #[test]
    fn unrelated_tabs_stay_apart() {
        let tabs = vec![
            tab("PR #12", "https://github.com/org/repo/pull/12", "diff"),
            tab("Re: invoice", "https://mail.google.com/mail/u/0", "payment"),
        ];
        let clusters = cluster_tabs(&tabs, THRESHOLD);
        assert_eq!(clusters.len(), 2);
        assert_partition(&clusters, 2);
    }

    #[test]
    fn partition_invariant_holds_for_mixed_input() {
        let tabs = vec![
            tab("Q3 Plan", "https://docs.google.com/document/d/1", "budget"),
            tab("Rust", "https://en.wikipedia.org/wiki/Rust", "language"),
            tab("Q3 Plan notes", "https://docs.google.com/document/d/2", "budget"),
            tab("PR #12", "https://github.com/org/repo/pull/12", "diff"),
            tab("Borrow checker", "https://en.wikipedia.org/wiki/Borrow", "language"),
        ];
        let clusters = cluster_tabs(&tabs, THRESHOLD);
        assert_partition(&clusters, tabs.len());
        // Indices within each cluster are ascending.
        for cluster in &clusters {
            let mut sorted = cluster.clone();
            sorted.sort_unstable();
            assert_eq!(&sorted, cluster);
        }
    }

    #[test]
    fn single_link_transitivity_merges_chains() {
        // A ~ B and B ~ C must place A and C together even if A !~ C directly.
        let tabs = vec![
            tab("alpha beta", "https://docs.google.com/document/d/1", ""),
            tab("beta gamma", "https://docs.google.com/document/d/2", ""),
            tab("gamma delta", "https://docs.google.com/document/d/3", ""),
        ];
        let clusters = cluster_tabs(&tabs, THRESHOLD);
        assert_eq!(clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn clustering_is_idempotent() {
        let tabs = vec![
            tab("Q3 Plan", "https://docs.google.com/document/d/1", "budget"),
            tab("PR #12", "https://github.com/org/repo/pull/12", "diff"),
            tab("Q3 Plan", "https://docs.google.com/document/d/2", "budget"),
        ];
        let first = cluster_tabs(&tabs, THRESHOLD);
        let second = cluster_tabs(&tabs, THRESHOLD);
        assert_eq!(first, second);
    }

    #[test]
    fn threshold_of_one_separates_non_identical_tabs() {
        let tabs = vec![
            tab("Q3 Plan", "https://docs.google.com/document/d/1", "budget"),
            tab("Q3 Plan review", "https://docs.google.com/document/d/1", "budget"),
        ];
        let clusters = cluster_tabs(&tabs, 1.01);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn union_find_path_compression_is_consistent() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(4, 5);
        let root = uf.find(0);
        assert_eq!(uf.find(1), root);
        assert_eq!(uf.find(2), root);
        assert_ne!(uf.find(3), root);
        assert_eq!(uf.find(4), uf.find(5));
    }
}
