// =========================================================================
// FALSIFY-SEL: cluster-count selection contract
//
// The silhouette curve never reports K=1, its arg-max is the smallest K
// among equal maxima, and a vote keeps every tied leader.
// =========================================================================

use super::*;

fn blobs() -> Matrix<f64> {
    Matrix::from_vec(
        8,
        1,
        vec![0.0, 0.2, 0.4, 5.0, 5.2, 5.4, 12.0, 12.3],
    )
    .expect("valid matrix")
}

/// FALSIFY-SEL-001: no silhouette value at K=1, whatever the range
#[test]
fn falsify_sel_001_silhouette_only_k_two_up() {
    for k_max in 2..=6 {
        let sil = ClusterCountSelector::new(1, k_max)
            .expect("valid range")
            .silhouette(&blobs())
            .expect("curve computes");
        assert!(
            sil.curve.points().iter().all(|p| p.k >= 2),
            "FALSIFIED SEL-001: K=1 reported with k_max={k_max}"
        );
        assert_eq!(sil.curve.len(), k_max - 1);
    }
}

/// FALSIFY-SEL-002: best_k carries the maximum silhouette, smallest K on ties
#[test]
fn falsify_sel_002_best_k_is_argmax() {
    let sil = ClusterCountSelector::new(2, 6)
        .expect("valid range")
        .silhouette(&blobs())
        .expect("curve computes");
    let best = sil.curve.score(sil.best_k).expect("best K scored");
    for p in sil.curve.points() {
        assert!(
            p.score < best || (p.score == best && p.k >= sil.best_k),
            "FALSIFIED SEL-002: K={} scores {} against best K={} at {best}",
            p.k,
            p.score,
            sil.best_k
        );
    }
}

/// FALSIFY-SEL-003: tied leaders are all reported
#[test]
fn falsify_sel_003_ties_preserved() {
    let mut votes = VoteDistribution::default();
    votes.record("x", Some(4));
    votes.record("y", Some(2));
    votes.record("z", Some(4));
    votes.record("w", Some(2));
    votes.record("v", Some(3));
    assert_eq!(
        votes.leaders(),
        vec![2, 4],
        "FALSIFIED SEL-003: tie collapsed"
    );
}

/// FALSIFY-SEL-004: every vote lies in the candidate range
#[test]
fn falsify_sel_004_votes_within_range() {
    let selector = ClusterCountSelector::new(3, 5).expect("valid range");
    let votes = selector
        .vote(&blobs(), &default_indices(), VoteMethod::KMeans)
        .expect("vote runs");
    for k in votes.counts().keys() {
        assert!(
            selector.range().contains(k),
            "FALSIFIED SEL-004: vote for K={k} outside 3..=5"
        );
    }
}
