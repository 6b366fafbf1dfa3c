// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Similarity scoring between a live skeleton and a reference skeleton.

use crate::config::ScoringConfig;
use crate::keypoint::Skeleton;

/// Score how closely `live` matches `reference`.
///
/// Only indices present in both skeletons whose keypoints both exceed the confidence cutoff
/// are compared, and pairs whose distance is not finite are skipped. The score is `1 / (1 + mean_distance / distance_scale)`, so identical
/// skeletons score `1.0` and the score falls towards `0.0` as the mean pixel distance grows.
/// With no comparable pair the score is `0.0`.
///
/// Both skeletons must be in the same pixel coordinate frame. A mirrored display must not be
/// applied to the coordinates passed here.
///
/// # Arguments
///
/// * `live` - Skeleton detected in the current frame.
/// * `reference` - Skeleton of the pose being matched.
/// * `config` - Confidence cutoff and distance scale.
///
/// # Returns
///
/// Similarity score in `[0, 1]`.
#[must_use]
pub fn score(live: &Skeleton, reference: &Skeleton, config: &ScoringConfig) -> f32 {
    let cutoff = config.confidence_threshold;
    let (sum, count) = live
        .iter()
        .zip(reference.iter())
        .filter(|(a, b)| a.is_usable(cutoff) && b.is_usable(cutoff))
        .map(|(a, b)| a.distance(b))
        .filter(|d| d.is_finite())
        .fold((0.0_f32, 0_usize), |(sum, count), d| (sum + d, count + 1));

    if count == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean_distance = sum / count as f32;
    (1.0 / (1.0 + mean_distance / config.distance_scale)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::Keypoint;

    fn skeleton(points: &[(f32, f32, f32)]) -> Skeleton {
        Skeleton::new(points.iter().map(|&(x, y, s)| Keypoint::new(x, y, s)).collect())
    }

    fn standing() -> Skeleton {
        skeleton(&[
            (320.0, 80.0, 0.9),
            (300.0, 150.0, 0.8),
            (340.0, 150.0, 0.85),
            (290.0, 260.0, 0.7),
            (350.0, 260.0, 0.75),
        ])
    }

    #[test]
    fn test_identity_scores_one() {
        let pose = standing();
        assert!((score(&pose, &pose.clone(), &ScoringConfig::default()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_comparable_pairs_scores_zero() {
        let low = skeleton(&[(0.0, 0.0, 0.4), (10.0, 10.0, 0.2)]);
        assert!(score(&low, &standing(), &ScoringConfig::default()).abs() < f32::EPSILON);
        assert!(score(&Skeleton::default(), &standing(), &ScoringConfig::default()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_known_distance() {
        // Every pair 100px apart -> 1 / (1 + 1) = 0.5
        let reference = standing();
        let live = reference.translated(60.0, 80.0);
        assert!((score(&live, &reference, &ScoringConfig::default()) - 0.5).abs() < 1e-5);

        let tight = ScoringConfig {
            distance_scale: 50.0,
            ..ScoringConfig::default()
        };
        assert!((score(&live, &reference, &tight) - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_only_overlapping_confident_pairs_count() {
        let reference = skeleton(&[(0.0, 0.0, 0.9), (100.0, 0.0, 0.9), (0.0, 0.0, 0.1)]);
        // Index 1 is unreliable in the live pose, index 2 unreliable in the reference,
        // index 3 missing from the reference.
        let live = skeleton(&[
            (0.0, 0.0, 0.9),
            (500.0, 500.0, 0.3),
            (900.0, 900.0, 0.9),
            (700.0, 0.0, 0.9),
        ]);
        assert!((score(&live, &reference, &ScoringConfig::default()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_and_monotonicity() {
        let reference = standing();
        let config = ScoringConfig::default();
        let mut previous = f32::INFINITY;
        for step in 0..50 {
            #[allow(clippy::cast_precision_loss)]
            let offset = step as f32 * 7.5;
            let s = score(&reference.translated(offset, offset / 2.0), &reference, &config);
            assert!((0.0..=1.0).contains(&s));
            assert!(s <= previous);
            previous = s;
        }

        let anchor = skeleton(&[(1.0, 0.0, 0.9)]);
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let live = skeleton(&[(bad, 0.0, 0.9)]);
            let s = score(&live, &anchor, &config);
            assert!((0.0..=1.0).contains(&s));
            assert!(s.abs() < f32::EPSILON);
        }

        // A corrupt landmark is ignored, the rest still scores.
        let live = skeleton(&[(1.0, 0.0, 0.9), (f32::NAN, 5.0, 0.9)]);
        let reference = skeleton(&[(1.0, 0.0, 0.9), (2.0, 5.0, 0.9)]);
        assert!((score(&live, &reference, &config) - 1.0).abs() < 1e-6);
    }
}
