use crate::{
    database::db_structs::{Photo, PhotoAggregate, Rater, RaterProfile, RatingSubmission},
    model::{
        aggregator::{self, NormalizedRating},
        config::EngineConfig,
        error::EngineError,
        matching, normalizer, rater_stats,
        skip_cache::SkipCache,
        structures::rating_axis::RatingAxis
    }
};
use chrono::{DateTime, FixedOffset};
use std::collections::HashSet;

/// The rating pipeline: validation, bias/rigor correction, weighting,
/// aggregation, and next-photo selection. Pure and persistence-free;
/// the store layer wires these steps into transactions.
pub struct RatingEngine {
    config: EngineConfig
}

impl Default for RatingEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RatingEngine {
    pub fn new(config: EngineConfig) -> RatingEngine {
        RatingEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rejects malformed input before normalization runs. Out-of-range
    /// scores are surfaced immediately and never retried.
    pub fn validate(&self, submission: &RatingSubmission) -> Result<(), EngineError> {
        if submission.photo_id <= 0 {
            return Err(EngineError::InvalidPhotoId);
        }

        let min = self.config.scale_min as i32;
        let max = self.config.scale_max as i32;

        let axes = [
            (RatingAxis::Attraction, submission.attraction),
            (RatingAxis::Trust, submission.trust),
            (RatingAxis::Intelligence, submission.intelligence),
        ];

        for (axis, value) in axes {
            if value < min || value > max {
                return Err(EngineError::ScoreOutOfRange { axis, value, min, max });
            }
        }

        Ok(())
    }

    /// Converts a raw submission into a normalized rating using the
    /// rater's profile as it stands right now. The snapshot is final:
    /// later shifts in the rater's statistics never replay into photos
    /// already rated.
    pub fn process(&self, profile: &RaterProfile, submission: &RatingSubmission) -> NormalizedRating {
        let (bias, rigor) = rater_stats::estimate(profile, &self.config);
        let weight = rater_stats::calculate_weight(profile.ratings_given, &self.config);

        NormalizedRating {
            rater_id: submission.rater_id,
            photo_id: submission.photo_id,
            attraction: normalizer::normalize(submission.attraction as f64, bias, rigor, &self.config),
            trust: normalizer::normalize(submission.trust as f64, bias, rigor, &self.config),
            intelligence: normalizer::normalize(submission.intelligence as f64, bias, rigor, &self.config),
            weight,
            bias,
            rigor
        }
    }

    /// Folds a normalized rating into the photo's aggregate.
    pub fn apply(&self, aggregate: &mut PhotoAggregate, rating: &NormalizedRating) {
        aggregator::apply_rating(aggregate, rating, &self.config);
    }

    /// Folds the raw scores into the rater's running statistics.
    pub fn record_submission(&self, profile: &mut RaterProfile, submission: &RatingSubmission) {
        rater_stats::record_submission(
            profile,
            [submission.attraction, submission.trust, submission.intelligence]
        );
    }

    /// Selects the next eligible photo for a rater, or `None` when the
    /// pool is exhausted.
    pub fn select_next<'a>(
        &self,
        rater: &Rater,
        candidates: &'a [Photo],
        already_rated: &HashSet<i32>,
        skips: &SkipCache,
        now: DateTime<FixedOffset>
    ) -> Option<&'a Photo> {
        matching::select_next(rater, candidates, already_rated, skips, now)
    }

    /// True once the photo has enough ratings for its scores to be shown
    /// to the owner.
    pub fn scores_disclosed(&self, aggregate: &PhotoAggregate) -> bool {
        aggregate.rating_count >= self.config.disclosure_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{generate_rater_profile, generate_submission};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_validate_accepts_in_range() {
        let engine = RatingEngine::default();
        let submission = generate_submission(1, 10, 1, 10, 5);

        assert!(engine.validate(&submission).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let engine = RatingEngine::default();

        let too_high = generate_submission(1, 10, 11, 5, 5);
        match engine.validate(&too_high) {
            Err(EngineError::ScoreOutOfRange { axis, value, .. }) => {
                assert_eq!(axis, RatingAxis::Attraction);
                assert_eq!(value, 11);
            }
            other => panic!("expected ScoreOutOfRange, got {:?}", other)
        }

        let too_low = generate_submission(1, 10, 5, 0, 5);
        assert!(engine.validate(&too_low).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_photo_id() {
        let engine = RatingEngine::default();
        let submission = generate_submission(1, 0, 5, 5, 5);

        assert!(matches!(engine.validate(&submission), Err(EngineError::InvalidPhotoId)));
    }

    #[test]
    fn test_process_neutral_rater_passes_scores_through() {
        let engine = RatingEngine::default();
        let profile = generate_rater_profile(1, 0.0, 0.0, 0);
        let submission = generate_submission(1, 10, 8, 8, 8);

        let normalized = engine.process(&profile, &submission);

        assert_abs_diff_eq!(normalized.attraction, 8.0, epsilon = 1e-10);
        assert_abs_diff_eq!(normalized.trust, 8.0, epsilon = 1e-10);
        assert_abs_diff_eq!(normalized.intelligence, 8.0, epsilon = 1e-10);
        assert_eq!(normalized.weight, 0.5);
        assert_eq!(normalized.bias, 0.0);
        assert_eq!(normalized.rigor, 1.0);
    }

    #[test]
    fn test_process_corrects_lenient_experienced_rater() {
        let engine = RatingEngine::default();
        // Mean 7.5 -> bias 2.0; global spread -> rigor 1.0; 60 ratings -> weight 1.0
        let profile = generate_rater_profile(1, 7.5, 1.8, 60);
        let submission = generate_submission(1, 10, 9, 8, 7);

        let normalized = engine.process(&profile, &submission);

        assert_abs_diff_eq!(normalized.attraction, 7.0, epsilon = 1e-10);
        assert_abs_diff_eq!(normalized.trust, 6.0, epsilon = 1e-10);
        assert_abs_diff_eq!(normalized.intelligence, 5.0, epsilon = 1e-10);
        assert_eq!(normalized.weight, 1.0);
    }

    #[test]
    fn test_scores_disclosed_at_threshold() {
        let engine = RatingEngine::default();
        let mut aggregate = PhotoAggregate::empty(1);

        aggregate.rating_count = 9;
        assert!(!engine.scores_disclosed(&aggregate));

        aggregate.rating_count = 10;
        assert!(engine.scores_disclosed(&aggregate));
    }
}
