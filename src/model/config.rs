use crate::model::constants;
use chrono::Duration;

/// Every tunable the engine depends on, injectable so tests can run
/// with varied economy parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scale_min: f64,
    pub scale_max: f64,
    pub global_mean: f64,
    pub global_std: f64,
    pub min_ratings_for_stats: i32,
    pub experienced_rater_threshold: i32,
    pub unreliable_weight: f64,
    pub ramp_weight_min: f64,
    pub full_weight: f64,
    pub rigor_floor: f64,
    pub confidence_rate: f64,
    pub disclosure_threshold: i32,
    pub max_karma: i32,
    pub starting_karma: i32,
    pub regen_amount: i32,
    pub regen_interval: Duration,
    pub skip_cache_capacity: usize,
    pub skip_ttl: Duration
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            scale_min: constants::SCALE_MIN,
            scale_max: constants::SCALE_MAX,
            global_mean: constants::GLOBAL_MEAN,
            global_std: constants::GLOBAL_STD,
            min_ratings_for_stats: constants::MIN_RATINGS_FOR_STATS,
            experienced_rater_threshold: constants::EXPERIENCED_RATER_THRESHOLD,
            unreliable_weight: constants::UNRELIABLE_WEIGHT,
            ramp_weight_min: constants::RAMP_WEIGHT_MIN,
            full_weight: constants::FULL_WEIGHT,
            rigor_floor: constants::RIGOR_FLOOR,
            confidence_rate: constants::CONFIDENCE_RATE,
            disclosure_threshold: constants::DISCLOSURE_THRESHOLD,
            max_karma: constants::MAX_KARMA,
            starting_karma: constants::STARTING_KARMA,
            regen_amount: constants::REGEN_AMOUNT,
            regen_interval: Duration::minutes(constants::REGEN_INTERVAL_MINUTES),
            skip_cache_capacity: constants::SKIP_CACHE_CAPACITY,
            skip_ttl: Duration::minutes(constants::SKIP_TTL_MINUTES)
        }
    }
}
