

/// Cosine similarity of two vectors; 0.0 for mismatched lengths or zero norms.
pub fn cosine_similarity(vec1: &[f32], vec2: &[f32]) -> f64 {
    if vec1.len() != vec2.len() || vec1.is_empty() {
        return 0.0;
    }

    let (mut dot, mut mag1, mut mag2) = (0.0f64, 0.0f64, 0.0f64);
    for (a, b) in vec1.iter().zip(vec2) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        mag1 += a * a;
        mag2 += b * b;
    }

    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    dot / (mag1.sqrt() * mag2.sqrt())
}

/// Component-wise mean of equally sized vectors.
pub fn mean_pool(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut sums = vec![0.0f64; first.len()];
    for vector in vectors {
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }
    let n = vectors.len() as f64;
    sums.into_iter().map(|s| (s / n) as f32).collect()
}

/// Clamps a raw similarity into `[0, 1]` for persistence. NaN maps to 0.0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

/// Blended paper-to-paper similarity over chunk embeddings:
/// `alpha * best_match + (1 - alpha) * mean_pool`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceScorer {
    alpha: f64,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ALPHA)
    }
}

impl RelevanceScorer {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: if alpha.is_nan() { crate::DEFAULT_ALPHA } else { alpha.clamp(0.0, 1.0) },
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Raw blended score. Either side empty yields exactly 0.0. The result is
    /// not clamped; see [`clamp_score`].
    pub fn score(&self, a: &[Vec<f32>], b: &[Vec<f32>]) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let best = Self::best_match_similarity(a, b);
        let mean = Self::mean_pool_similarity(a, b);
        self.alpha * best + (1.0 - self.alpha) * mean
    }


    pub fn mean_pool_similarity(a: &[Vec<f32>], b: &[Vec<f32>]) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        cosine_similarity(&mean_pool(a), &mean_pool(b))
    }

    /// Mean over A of each chunk's best match in B, averaged with the same
    /// quantity taken from B's side.
    pub fn best_match_similarity(a: &[Vec<f32>], b: &[Vec<f32>]) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let mut row_best = vec![f64::NEG_INFINITY; a.len()];
        let mut col_best = vec![f64::NEG_INFINITY; b.len()];
        for (i, va) in a.iter().enumerate() {
            for (j, vb) in b.iter().enumerate() {
                let sim = cosine_similarity(va, vb);
                row_best[i] = row_best[i].max(sim);
                col_best[j] = col_best[j].max(sim);
            }
        }

        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        (mean(&row_best) + mean(&col_best)) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_a() -> Vec<Vec<f32>> {
        vec![vec![1.0, 0.2, 0.0], vec![0.3, 0.9, 0.1], vec![0.0, 0.1, 1.0]]
    }

    fn paper_b() -> Vec<Vec<f32>> {
        vec![vec![0.9, 0.1, 0.1], vec![0.2, 0.2, 0.8]]
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_mean_pool() {
        assert_eq!(mean_pool(&[vec![1.0, 3.0], vec![3.0, 5.0]]), vec![2.0, 4.0]);
        assert!(mean_pool(&[]).is_empty());
    }

    #[test]
    fn test_self_similarity_is_one() {
        let scorer = RelevanceScorer::default();
        assert!((scorer.score(&paper_a(), &paper_a()) - 1.0).abs() < 1e-9);
        assert!((scorer.score(&paper_b(), &paper_b()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_symmetry() {
        for alpha in [0.0, 0.5, 0.6, 1.0] {
            let scorer = RelevanceScorer::new(alpha);
            let ab = scorer.score(&paper_a(), &paper_b());
            let ba = scorer.score(&paper_b(), &paper_a());
            assert!((ab - ba).abs() < 1e-12, "alpha={} ab={} ba={}", alpha, ab, ba);
        }
    }

    #[test]
    fn test_empty_inputs_score_exactly_zero() {
        let scorer = RelevanceScorer::default();
        assert_eq!(scorer.score(&[], &paper_b()), 0.0);
        assert_eq!(scorer.score(&paper_a(), &[]), 0.0);
        assert_eq!(scorer.score(&[], &[]), 0.0);
    }

    #[test]
    fn test_blend_weights() {
        let a = paper_a();
        let b = paper_b();
        let best = RelevanceScorer::best_match_similarity(&a, &b);
        let mean = RelevanceScorer::mean_pool_similarity(&a, &b);

        assert!((RelevanceScorer::new(1.0).score(&a, &b) - best).abs() < 1e-12);
        assert!((RelevanceScorer::new(0.0).score(&a, &b) - mean).abs() < 1e-12);
        assert!((RelevanceScorer::new(0.6).score(&a, &b) - (0.6 * best + 0.4 * mean)).abs() < 1e-12);
    }

    #[test]
    fn test_best_match_prefers_partial_overlap() {
        // One shared section among unrelated ones still counts through best-match.
        let a = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let b = vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]];
        let best = RelevanceScorer::best_match_similarity(&a, &b);
        assert!((best - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(1.000_000_2), 1.0);
        assert_eq!(clamp_score(-0.3), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_eq!(RelevanceScorer::new(3.0).alpha(), 1.0);
        assert_eq!(RelevanceScorer::new(f64::NAN).alpha(), crate::DEFAULT_ALPHA);
    }
}
