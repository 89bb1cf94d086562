use crate::config::SimilarityWeights;
use crate::message::{MAX_CONTENT_CHARS, Message};

/// Horizon for temporal proximity: messages further apart than this
/// score 0 on the temporal component.
pub const THIRTY_DAYS_SECS: i64 = 30 * 24 * 60 * 60;

/// 1.0 for identical timestamps, falling linearly to 0.0 at 30 days apart.
pub fn temporal_proximity(a: &Message, b: &Message) -> f64 {
    let delta = (a.created_at - b.created_at).abs();
    (1.0 - delta as f64 / THIRTY_DAYS_SECS as f64).max(0.0)
}

/// 1.0 for equal character counts, falling linearly to 0.0 at the
/// maximum possible length difference.
pub fn length_similarity(a: &Message, b: &Message) -> f64 {
    let delta = a.char_len().abs_diff(b.char_len());
    1.0 - delta as f64 / MAX_CONTENT_CHARS as f64
}

/// Reserved slot for a future embedding-based term. Returns 0.0 for every
/// pair; kept as a named component (rather than silently dropped) so the
/// weight budget and call sites are already in place when it lands.
pub fn semantic_affinity(_a: &Message, _b: &Message) -> f64 {
    0.0
}

/// Weighted blend of the component scores. With valid weights the result
/// is in [0, 1].
pub fn similarity(a: &Message, b: &Message, weights: &SimilarityWeights) -> f64 {
    weights.temporal * temporal_proximity(a, b)
        + weights.length * length_similarity(a, b)
        + weights.semantic * semantic_affinity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn message(id: i64, created_at: i64, content: &str) -> Message {
        Message {
            id,
            content: content.to_string(),
            created_at,
            approved: true,
            deleted_at: None,
        }
    }

    #[test]
    fn test_temporal_identical_timestamps() {
        let a = message(1, 1_700_000_000, "a");
        let b = message(2, 1_700_000_000, "b");
        assert_relative_eq!(temporal_proximity(&a, &b), 1.0);
    }

    #[test]
    fn test_temporal_half_horizon() {
        let a = message(1, 1_700_000_000, "a");
        let b = message(2, 1_700_000_000 + THIRTY_DAYS_SECS / 2, "b");
        assert_relative_eq!(temporal_proximity(&a, &b), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_temporal_clamps_at_zero() {
        let a = message(1, 1_700_000_000, "a");
        let b = message(2, 1_700_000_000 + 2 * THIRTY_DAYS_SECS, "b");
        assert_relative_eq!(temporal_proximity(&a, &b), 0.0);
    }

    #[test]
    fn test_length_similarity_equal() {
        let a = message(1, 0, "same size");
        let b = message(2, 0, "also same");
        assert_relative_eq!(length_similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_length_similarity_extreme() {
        let a = message(1, 0, "x");
        let b = message(2, 0, &"y".repeat(MAX_CONTENT_CHARS));
        assert_relative_eq!(
            length_similarity(&a, &b),
            1.0 - (MAX_CONTENT_CHARS - 1) as f64 / MAX_CONTENT_CHARS as f64,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_semantic_is_inert() {
        let a = message(1, 0, "grief");
        let b = message(2, 0, "grief");
        assert_eq!(semantic_affinity(&a, &b), 0.0);
    }

    #[test]
    fn test_blend_uses_weights() {
        let weights = SimilarityWeights::default();
        let a = message(1, 1_700_000_000, "equal");
        let b = message(2, 1_700_000_000, "equal");
        // Both active components at 1.0, semantic at 0.0.
        assert_relative_eq!(
            similarity(&a, &b, &weights),
            weights.temporal + weights.length,
            epsilon = 1e-9
        );
    }

    proptest! {
        #[test]
        fn prop_similarity_in_unit_interval(
            dt in 0i64..(4 * THIRTY_DAYS_SECS),
            len_a in 1usize..=MAX_CONTENT_CHARS,
            len_b in 1usize..=MAX_CONTENT_CHARS,
        ) {
            let weights = SimilarityWeights::default();
            let a = message(1, 1_700_000_000, &"a".repeat(len_a));
            let b = message(2, 1_700_000_000 + dt, &"b".repeat(len_b));
            let s = similarity(&a, &b, &weights);
            prop_assert!((0.0..=1.0).contains(&s), "score out of range: {s}");
        }

        #[test]
        fn prop_similarity_symmetric(
            dt in -(2 * THIRTY_DAYS_SECS)..(2 * THIRTY_DAYS_SECS),
            len_a in 1usize..=MAX_CONTENT_CHARS,
            len_b in 1usize..=MAX_CONTENT_CHARS,
        ) {
            let weights = SimilarityWeights::default();
            let a = message(1, 1_700_000_000, &"a".repeat(len_a));
            let b = message(2, 1_700_000_000 + dt, &"b".repeat(len_b));
            prop_assert!((similarity(&a, &b, &weights) - similarity(&b, &a, &weights)).abs() < 1e-12);
        }
    }
}
