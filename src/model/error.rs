use crate::model::structures::rating_axis::RatingAxis;
use thiserror::Error;

/// Every failure the engine can surface. All variants are local to the
/// operation that raised them; none crash the process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {axis} score {value}: expected an integer in {min}..={max}")]
    ScoreOutOfRange {
        axis: RatingAxis,
        value: i32,
        min: i32,
        max: i32
    },

    #[error("missing or invalid photo id")]
    InvalidPhotoId,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("photo {photo_id} is not open for rating")]
    PhotoNotRateable { photo_id: i32 },

    #[error("rater {rater_id} has already rated photo {photo_id}")]
    DuplicateRating { rater_id: i32, photo_id: i32 },

    #[error("karma regeneration available in {remaining_minutes} minute(s)")]
    RegenTooEarly { remaining_minutes: i64 },

    #[error("karma already at maximum ({current})")]
    KarmaFull { current: i32 },

    #[error("insufficient karma: have {current}, need {required}")]
    InsufficientKarma { current: i32, required: i32 },

    #[error("database error: {0}")]
    Store(#[from] tokio_postgres::Error)
}

impl EngineError {
    /// True for rejections the caller may not retry verbatim: bad input,
    /// duplicates, karma gating. Store errors are the retryable class,
    /// safe because regeneration and aggregation are conditional updates.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }
}
