use super::features::FeatureMap;

/// Cosine similarity of two dense vectors.
///
/// Returns 0.0 for empty or all-zero inputs, mismatched lengths, or any
/// non-finite component. The result is in [-1, 1]; callers that need a
/// non-negative score clamp it themselves.
pub fn cosine_dense(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    finish(dot, norm_a, norm_b)
}

/// Cosine similarity of two sparse feature maps over the union of their keys
pub fn cosine_sparse(a: &FeatureMap, b: &FeatureMap) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Keys missing from one side contribute zero to the dot product.
    let dot: f64 = a
        .iter()
        .filter_map(|(key, weight)| b.get(key).map(|other| weight * other))
        .sum();
    let norm_a: f64 = a.values().map(|w| w * w).sum();
    let norm_b: f64 = b.values().map(|w| w * w).sum();

    finish(dot, norm_a, norm_b)
}

/// Dense cosine clamped to [0, 1] for blending into non-negative scores
pub fn clamped_cosine(a: &[f32], b: &[f32]) -> f64 {
    cosine_dense(a, b).clamp(0.0, 1.0)
}

fn finish(dot: f64, norm_sq_a: f64, norm_sq_b: f64) -> f64 {
    if !(dot.is_finite() && norm_sq_a.is_finite() && norm_sq_b.is_finite()) {
        return 0.0;
    }
    if norm_sq_a == 0.0 || norm_sq_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_sq_a.sqrt() * norm_sq_b.sqrt())).clamp(-1.0, 1.0)
}
