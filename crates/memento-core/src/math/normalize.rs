//! Distribution alignment and min-max normalization — used to make
//! vector-search and full-text-search scores comparable before fusion.

/// Align raw scores to a target (mean, std) via z-score rescaling:
/// `target_mean + (s - mean) * target_std / std`.
///
/// If the input's standard deviation is 0 (all scores equal, or a
/// single score), every output equals `target_mean`.
pub fn align_distribution(scores: &[f32], target_mean: f32, target_std: f32) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let n = scores.len() as f32;
    let mean = scores.iter().sum::<f32>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();

    if std == 0.0 {
        return vec![target_mean; scores.len()];
    }

    scores
        .iter()
        .map(|s| target_mean + (s - mean) * target_std / std)
        .collect()
}

/// Min-max normalize scores into `[0, 1]`.
///
/// If `max == min` (including the single-element and empty cases),
/// every output is 0.5; an empty input returns an empty vector.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

    if (max - min).abs() < f32::EPSILON {
        return vec![0.5; scores.len()];
    }

    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_distribution_matches_target_moments() {
        let scores = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let aligned = align_distribution(&scores, 0.5, 0.2);
        let n = aligned.len() as f32;
        let mean = aligned.iter().sum::<f32>() / n;
        assert!((mean - 0.5).abs() < 1e-5);
    }

    #[test]
    fn align_distribution_constant_input_collapses_to_target_mean() {
        let scores = vec![3.0, 3.0, 3.0];
        let aligned = align_distribution(&scores, 0.7, 0.1);
        assert!(aligned.iter().all(|&s| (s - 0.7).abs() < 1e-6));
    }

    #[test]
    fn align_distribution_empty_input() {
        assert!(align_distribution(&[], 0.5, 0.2).is_empty());
    }

    #[test]
    fn min_max_normalize_scales_to_unit_range() {
        let scores = vec![10.0, 20.0, 30.0];
        let normed = min_max_normalize(&scores);
        assert_eq!(normed, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn min_max_normalize_constant_input_is_half() {
        let scores = vec![5.0, 5.0, 5.0];
        assert_eq!(min_max_normalize(&scores), vec![0.5, 0.5, 0.5]);
    }
}
