use crate::{database::db_structs::RaterProfile, model::config::EngineConfig};

/// Derives a leniency bias and a scale-usage (rigor) factor from a rater's
/// historical statistics. Pure function of the profile snapshot.
///
/// A rater with fewer than `min_ratings_for_stats` submissions has no
/// reliable history and is treated as neutral: bias 0, rigor 1.
pub fn estimate(profile: &RaterProfile, config: &EngineConfig) -> (f64, f64) {
    if profile.ratings_given < config.min_ratings_for_stats {
        return (0.0, 1.0);
    }

    let bias = profile.mean_given - config.global_mean;
    let rigor = (profile.std_dev_given / config.global_std).max(config.rigor_floor);

    (bias, rigor)
}

/// The influence a rating carries in the aggregate, scaled by rater
/// experience. Non-decreasing in `ratings_given` and bounded in
/// [`unreliable_weight`, `full_weight`].
pub fn calculate_weight(ratings_given: i32, config: &EngineConfig) -> f64 {
    if ratings_given < config.min_ratings_for_stats {
        return config.unreliable_weight;
    }

    if ratings_given >= config.experienced_rater_threshold {
        return config.full_weight;
    }

    // Linear ramp between the reliability threshold and full experience
    let span = (config.experienced_rater_threshold - config.min_ratings_for_stats) as f64;
    let progress = (ratings_given - config.min_ratings_for_stats) as f64 / span;

    config.ramp_weight_min + (config.full_weight - config.ramp_weight_min) * progress
}

/// Folds one accepted submission into the rater's running statistics.
/// Each of the three axis scores counts as one sample; `ratings_given`
/// counts submissions.
///
/// Welford's online update, reconstructed from the stored mean and
/// standard deviation so the profile row stays three columns wide.
pub fn record_submission(profile: &mut RaterProfile, scores: [i32; 3]) {
    let mut n = (profile.ratings_given as f64) * 3.0;
    let mut mean = profile.mean_given;
    let mut m2 = profile.std_dev_given.powi(2) * n;

    for score in scores {
        let x = score as f64;
        n += 1.0;
        let delta = x - mean;
        mean += delta / n;
        m2 += delta * (x - mean);
    }

    profile.mean_given = mean;
    profile.std_dev_given = (m2 / n).sqrt();
    profile.ratings_given += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::utils::test_utils::generate_rater_profile;

    #[test]
    fn test_estimate_neutral_below_threshold() {
        let config = EngineConfig::default();
        let profile = generate_rater_profile(1, 8.2, 0.4, 9);

        let (bias, rigor) = estimate(&profile, &config);

        assert_eq!(bias, 0.0);
        assert_eq!(rigor, 1.0);
    }

    #[test]
    fn test_estimate_lenient_rater() {
        let config = EngineConfig::default();
        let profile = generate_rater_profile(1, 7.3, 1.8, 25);

        let (bias, rigor) = estimate(&profile, &config);

        assert_abs_diff_eq!(bias, 1.8, epsilon = 1e-10);
        assert_abs_diff_eq!(rigor, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_estimate_timid_rater() {
        let config = EngineConfig::default();
        let profile = generate_rater_profile(1, 5.5, 0.9, 25);

        let (bias, rigor) = estimate(&profile, &config);

        assert_abs_diff_eq!(bias, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(rigor, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_estimate_rigor_floored_at_zero_variance() {
        let config = EngineConfig::default();
        let profile = generate_rater_profile(1, 5.0, 0.0, 100);

        let (_, rigor) = estimate(&profile, &config);

        assert_eq!(rigor, config.rigor_floor);
    }

    #[test]
    fn test_weight_unreliable() {
        let config = EngineConfig::default();

        assert_eq!(calculate_weight(0, &config), 0.5);
        assert_eq!(calculate_weight(9, &config), 0.5);
    }

    #[test]
    fn test_weight_ramp_bounds() {
        let config = EngineConfig::default();

        assert_abs_diff_eq!(calculate_weight(10, &config), 0.7, epsilon = 1e-10);
        assert_abs_diff_eq!(calculate_weight(30, &config), 0.85, epsilon = 1e-10);
        assert_eq!(calculate_weight(50, &config), 1.0);
        assert_eq!(calculate_weight(5000, &config), 1.0);
    }

    #[test]
    fn test_weight_monotone_non_decreasing() {
        let config = EngineConfig::default();

        let mut previous = 0.0;
        for n in 0..200 {
            let weight = calculate_weight(n, &config);
            assert!(weight >= previous);
            assert!((0.5..=1.0).contains(&weight));
            previous = weight;
        }
    }

    #[test]
    fn test_record_submission_from_empty() {
        let mut profile = generate_rater_profile(1, 0.0, 0.0, 0);

        record_submission(&mut profile, [4, 6, 8]);

        assert_eq!(profile.ratings_given, 1);
        assert_abs_diff_eq!(profile.mean_given, 6.0, epsilon = 1e-10);
        // Population std dev of {4, 6, 8}
        assert_abs_diff_eq!(profile.std_dev_given, (8.0f64 / 3.0).sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_record_submission_accumulates() {
        let mut incremental = generate_rater_profile(1, 0.0, 0.0, 0);
        record_submission(&mut incremental, [2, 3, 4]);
        record_submission(&mut incremental, [7, 8, 9]);

        // Batch-computed reference over all six samples
        let samples: [f64; 6] = [2.0, 3.0, 4.0, 7.0, 8.0, 9.0];
        let mean: f64 = samples.iter().sum::<f64>() / 6.0;
        let variance: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 6.0;

        assert_eq!(incremental.ratings_given, 2);
        assert_abs_diff_eq!(incremental.mean_given, mean, epsilon = 1e-10);
        assert_abs_diff_eq!(incremental.std_dev_given, variance.sqrt(), epsilon = 1e-10);
    }
}
