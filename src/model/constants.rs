// Engine constants
pub const SCALE_MIN: f64 = 1.0;
pub const SCALE_MAX: f64 = 10.0;
pub const GLOBAL_MEAN: f64 = 5.5;
pub const GLOBAL_STD: f64 = 1.8;
// Below this many submissions a rater's statistics are treated as neutral
pub const MIN_RATINGS_FOR_STATS: i32 = 10;
pub const EXPERIENCED_RATER_THRESHOLD: i32 = 50;
pub const UNRELIABLE_WEIGHT: f64 = 0.5;
pub const RAMP_WEIGHT_MIN: f64 = 0.7;
pub const FULL_WEIGHT: f64 = 1.0;
// Rigor is a ratio of standard deviations and must never reach zero
pub const RIGOR_FLOOR: f64 = 0.05;
pub const CONFIDENCE_RATE: f64 = 0.05;
// Aggregate scores are hidden from owners until this many ratings accumulate
pub const DISCLOSURE_THRESHOLD: i32 = 10;
// Karma economy
pub const MAX_KARMA: i32 = 50;
pub const STARTING_KARMA: i32 = 10;
pub const REGEN_AMOUNT: i32 = 5;
pub const REGEN_INTERVAL_MINUTES: i64 = 60;
// Skip cache
pub const SKIP_CACHE_CAPACITY: usize = 100;
pub const SKIP_TTL_MINUTES: i64 = 30;
