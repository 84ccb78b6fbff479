use crate::{
    database::db_structs::PhotoAggregate,
    model::{confidence::confidence, config::EngineConfig}
};
use serde::Serialize;

/// A rating after bias/rigor correction, carrying the weight it will have
/// in the aggregate. Derived at submission time from the rater's profile
/// snapshot; never persisted verbatim and never recomputed when the
/// rater's later history shifts their bias.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedRating {
    pub rater_id: i32,
    pub photo_id: i32,
    pub attraction: f64,
    pub trust: f64,
    pub intelligence: f64,
    pub weight: f64,
    pub bias: f64,
    pub rigor: f64
}

/// Folds one normalized rating into a photo's running weighted means.
///
/// The durable path expresses this same update as a single SQL
/// read-modify-write; this in-memory form backs the replay tracker and
/// the unit tests. Both must stay arithmetically identical.
pub fn apply_rating(aggregate: &mut PhotoAggregate, rating: &NormalizedRating, config: &EngineConfig) {
    let old_weight = aggregate.total_weight;
    let weight = rating.weight;

    aggregate.attraction_mean = weighted_mean(aggregate.attraction_mean, old_weight, rating.attraction, weight);
    aggregate.trust_mean = weighted_mean(aggregate.trust_mean, old_weight, rating.trust, weight);
    aggregate.intelligence_mean = weighted_mean(aggregate.intelligence_mean, old_weight, rating.intelligence, weight);

    aggregate.total_weight += weight;
    aggregate.rating_count += 1;
    aggregate.confidence = confidence(aggregate.rating_count, config.confidence_rate);
}

fn weighted_mean(old_mean: f64, old_weight: f64, score: f64, weight: f64) -> f64 {
    (old_mean * old_weight + score * weight) / (old_weight + weight)
}
