//! Vector similarity primitives.

/// Compute cosine similarity between two vectors.
///
/// Returns `None` if the vectors differ in length or are empty, and
/// `Some(0.0)` if either vector has zero magnitude. Sums are accumulated in
/// `f64` so finite components of any magnitude neither overflow nor underflow.
/// The result is clamped to `[-1, 1]` and a zero score is always `+0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    let norm_a = norm_f64(a);
    let norm_b = norm_f64(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32;
    // -0.0 would sort apart from 0.0 under `total_cmp`.
    Some(if similarity == 0.0 { 0.0 } else { similarity })
}

/// Euclidean length of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    norm_f64(v) as f32
}

fn norm_f64(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// An embedding is usable when it is non-empty and every component is finite.
pub fn is_well_formed(embedding: &[f32]) -> bool {
    !embedding.is_empty() && embedding.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn self_similarity_is_one() {
        let v = [0.3, -1.2, 4.5, 0.01];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < EPS, "got {sim}");
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((sim + 1.0).abs() < EPS);
    }

    #[test]
    fn zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), Some(0.0));
    }

    #[test]
    fn dimension_mismatch_is_not_scorable() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
    }

    #[test]
    fn magnitude_does_not_matter() {
        let a = cosine_similarity(&[0.9, 0.1], &[1.0, 0.0]).unwrap();
        let b = cosine_similarity(&[9.0, 1.0], &[100.0, 0.0]).unwrap();
        assert!((a - b).abs() < EPS);
        assert!((a - 0.993_884).abs() < 1e-4);
    }

    #[test]
    fn huge_components_do_not_overflow() {
        let v = [1e20, 1e20];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < EPS, "got {sim}");

        let sim = cosine_similarity(&[1.0, 1.0], &[1e20, 1e20]).unwrap();
        assert!((sim - 1.0).abs() < EPS, "got {sim}");

        let sim = cosine_similarity(&[f32::MAX, 0.0], &[-f32::MAX, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < EPS, "got {sim}");
        assert!(l2_norm(&[1e20, 0.0]).is_finite());
    }

    #[test]
    fn tiny_components_do_not_underflow() {
        let v = [1e-30, 1e-30];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < EPS, "got {sim}");

        let sim = cosine_similarity(&[1e-30, 0.0], &[0.0, 1e-30]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn zero_score_is_positive_zero() {
        let sim = cosine_similarity(&[-1.0, 0.0], &[0.0, -1.0]).unwrap();
        assert!(sim.is_sign_positive());
        assert_eq!(sim.to_bits(), 0.0f32.to_bits());
    }

    #[test]
    fn well_formed_rejects_empty_and_non_finite() {
        assert!(is_well_formed(&[0.0]));
        assert!(!is_well_formed(&[]));
        assert!(!is_well_formed(&[1.0, f32::NAN]));
        assert!(!is_well_formed(&[f32::INFINITY]));
    }
}
