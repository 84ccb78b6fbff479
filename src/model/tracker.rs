use crate::{
    database::db_structs::{Photo, PhotoAggregate, RaterProfile, RatingSubmission},
    model::{engine::RatingEngine, error::EngineError}
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// In-memory rating state for the batch recompute: every rater profile
/// and photo aggregate, rebuilt by replaying the durable rating log in
/// submission order. Also serves as the store stand-in for tests.
///
/// Replay preserves the append-only rule: each rating is normalized
/// against the profile exactly as it stood when that rating arrived,
/// never against the rater's final statistics.
pub struct ReplayTracker {
    profiles: IndexMap<i32, RaterProfile>,
    aggregates: IndexMap<i32, PhotoAggregate>,
    rated: HashSet<(i32, i32)>
}

impl Default for ReplayTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayTracker {
    pub fn new() -> ReplayTracker {
        ReplayTracker {
            profiles: IndexMap::new(),
            aggregates: IndexMap::new(),
            rated: HashSet::new()
        }
    }

    /// Creates an empty aggregate for every photo approved for rating.
    pub fn seed_photos(&mut self, photos: &[Photo]) {
        for photo in photos {
            self.aggregates
                .entry(photo.id)
                .or_insert_with(|| PhotoAggregate::empty(photo.id));
        }
    }

    /// Replays one submission through the full pipeline: validate,
    /// duplicate-check, normalize against the current profile snapshot,
    /// aggregate, then fold the raw scores into the profile.
    pub fn apply(
        &mut self,
        engine: &RatingEngine,
        submission: &RatingSubmission
    ) -> Result<&PhotoAggregate, EngineError> {
        engine.validate(submission)?;

        if !self.rated.insert((submission.rater_id, submission.photo_id)) {
            return Err(EngineError::DuplicateRating {
                rater_id: submission.rater_id,
                photo_id: submission.photo_id
            });
        }

        if !self.aggregates.contains_key(&submission.photo_id) {
            self.rated.remove(&(submission.rater_id, submission.photo_id));
            return Err(EngineError::NotFound {
                entity: "photo",
                id: submission.photo_id
            });
        }

        let profile = self
            .profiles
            .entry(submission.rater_id)
            .or_insert_with(|| RaterProfile::empty(submission.rater_id));

        let normalized = engine.process(profile, submission);
        engine.record_submission(profile, submission);

        let aggregate = self
            .aggregates
            .get_mut(&submission.photo_id)
            .expect("aggregate presence checked above");
        engine.apply(aggregate, &normalized);

        Ok(aggregate)
    }

    pub fn profile(&self, rater_id: i32) -> Option<&RaterProfile> {
        self.profiles.get(&rater_id)
    }

    pub fn aggregate(&self, photo_id: i32) -> Option<&PhotoAggregate> {
        self.aggregates.get(&photo_id)
    }

    pub fn has_rated(&self, rater_id: i32, photo_id: i32) -> bool {
        self.rated.contains(&(rater_id, photo_id))
    }

    /// Photo ids the rater has already rated, in the shape the selector
    /// consumes.
    pub fn rated_photo_ids(&self, rater_id: i32) -> HashSet<i32> {
        self.rated
            .iter()
            .filter(|(r, _)| *r == rater_id)
            .map(|(_, p)| *p)
            .collect()
    }

    /// Orders both maps by id so batch saves are deterministic.
    pub fn sort(&mut self) {
        self.profiles.sort_by(|k1, _, k2, _| k1.cmp(k2));
        self.aggregates.sort_by(|k1, _, k2, _| k1.cmp(k2));
    }

    pub fn profiles(&self) -> impl Iterator<Item = &RaterProfile> {
        self.profiles.values()
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &PhotoAggregate> {
        self.aggregates.values()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn aggregate_count(&self) -> usize {
        self.aggregates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{generate_photo, generate_submission};
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, Utc};

    fn seeded_tracker() -> ReplayTracker {
        let now = Utc::now().fixed_offset();
        let photos = vec![
            generate_photo(10, 100, 0, now - Duration::days(2)),
            generate_photo(11, 101, 0, now - Duration::days(1)),
        ];

        let mut tracker = ReplayTracker::new();
        tracker.seed_photos(&photos);
        tracker
    }

    #[test]
    fn test_apply_creates_profile_on_first_rating() {
        let engine = RatingEngine::default();
        let mut tracker = seeded_tracker();

        tracker.apply(&engine, &generate_submission(1, 10, 8, 8, 8)).unwrap();

        let profile = tracker.profile(1).unwrap();
        assert_eq!(profile.ratings_given, 1);
        assert_abs_diff_eq!(profile.mean_given, 8.0, epsilon = 1e-10);

        let aggregate = tracker.aggregate(10).unwrap();
        assert_eq!(aggregate.rating_count, 1);
        assert_abs_diff_eq!(aggregate.attraction_mean, 8.0, epsilon = 1e-10);
    }

    #[test]
    fn test_apply_rejects_duplicate() {
        let engine = RatingEngine::default();
        let mut tracker = seeded_tracker();

        tracker.apply(&engine, &generate_submission(1, 10, 8, 8, 8)).unwrap();
        let result = tracker.apply(&engine, &generate_submission(1, 10, 5, 5, 5));

        assert!(matches!(result, Err(EngineError::DuplicateRating { .. })));
        assert_eq!(tracker.aggregate(10).unwrap().rating_count, 1);
    }

    #[test]
    fn test_apply_rejects_unknown_photo() {
        let engine = RatingEngine::default();
        let mut tracker = seeded_tracker();

        let result = tracker.apply(&engine, &generate_submission(1, 999, 5, 5, 5));

        assert!(matches!(result, Err(EngineError::NotFound { entity: "photo", .. })));
        // A failed apply must not leave the pair marked as rated
        assert!(!tracker.has_rated(1, 999));
    }

    #[test]
    fn test_rated_photo_ids_per_rater() {
        let engine = RatingEngine::default();
        let mut tracker = seeded_tracker();

        tracker.apply(&engine, &generate_submission(1, 10, 5, 5, 5)).unwrap();
        tracker.apply(&engine, &generate_submission(1, 11, 6, 6, 6)).unwrap();
        tracker.apply(&engine, &generate_submission(2, 10, 7, 7, 7)).unwrap();

        let rated = tracker.rated_photo_ids(1);
        assert_eq!(rated, HashSet::from([10, 11]));
        assert_eq!(tracker.rated_photo_ids(2), HashSet::from([10]));
    }

    #[test]
    fn test_sort_orders_by_id() {
        let engine = RatingEngine::default();
        let mut tracker = seeded_tracker();

        tracker.apply(&engine, &generate_submission(5, 11, 5, 5, 5)).unwrap();
        tracker.apply(&engine, &generate_submission(2, 10, 6, 6, 6)).unwrap();
        tracker.sort();

        let profile_ids: Vec<i32> = tracker.profiles().map(|p| p.rater_id).collect();
        assert_eq!(profile_ids, vec![2, 5]);

        let photo_ids: Vec<i32> = tracker.aggregates().map(|a| a.photo_id).collect();
        assert_eq!(photo_ids, vec![10, 11]);
    }
}
