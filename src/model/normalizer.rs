use crate::model::config::EngineConfig;

/// Corrects one raw axis score for the rater's leniency and scale usage.
///
/// A rater whose average sits above the global mean is lenient and their
/// scores are pulled down; a rater whose spread is narrower than global is
/// timid and their scores are stretched back out around the mean. The
/// result is always clamped to the rating scale.
pub fn normalize(raw: f64, bias: f64, rigor: f64, config: &EngineConfig) -> f64 {
    // Rigor of zero cannot occur via `estimate`, which floors it. Guard
    // anyway so a hand-built value cannot divide by zero.
    let rigor = rigor.max(config.rigor_floor);

    let shifted = raw - bias;
    let rescaled = config.global_mean + (shifted - config.global_mean) / rigor;

    rescaled.clamp(config.scale_min, config.scale_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_neutral_rater_is_identity_within_scale() {
        let config = EngineConfig::default();

        for raw in 1..=10 {
            assert_abs_diff_eq!(normalize(raw as f64, 0.0, 1.0, &config), raw as f64, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lenient_rater_pulled_down() {
        let config = EngineConfig::default();

        // Mean given 7.5 -> bias 2.0; an 8 reads like a 6
        assert_abs_diff_eq!(normalize(8.0, 2.0, 1.0, &config), 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_harsh_rater_pushed_up() {
        let config = EngineConfig::default();

        assert_abs_diff_eq!(normalize(4.0, -2.0, 1.0, &config), 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_timid_rater_stretched_outward() {
        let config = EngineConfig::default();

        // Narrow spread: a 6.5 from a rigor-0.5 rater means a 7.5
        assert_abs_diff_eq!(normalize(6.5, 0.0, 0.5, &config), 7.5, epsilon = 1e-10);
        // And a 4.5 means a 3.5
        assert_abs_diff_eq!(normalize(4.5, 0.0, 0.5, &config), 3.5, epsilon = 1e-10);
    }

    #[test]
    fn test_output_always_clamped() {
        let config = EngineConfig::default();

        for raw in -20..=30 {
            for bias in [-5.0, -1.0, 0.0, 1.0, 5.0] {
                for rigor in [0.0, 0.2, 0.5, 1.0, 2.0] {
                    let corrected = normalize(raw as f64, bias, rigor, &config);
                    assert!((config.scale_min..=config.scale_max).contains(&corrected));
                }
            }
        }
    }

    #[test]
    fn test_zero_rigor_defended() {
        let config = EngineConfig::default();

        let corrected = normalize(9.0, 0.0, 0.0, &config);
        assert!(corrected.is_finite());
        assert_eq!(corrected, config.scale_max);
    }
}
