use crate::model::structures::{gender::Gender, photo_status::PhotoStatus, test_type::TestType};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A user in their role as a rater. The identity provider has already
/// authenticated the id; the profile attributes only matter for premium
/// targeting checks.
#[derive(Debug, Clone, Serialize)]
pub struct Rater {
    pub id: i32,
    pub gender: Option<Gender>,
    pub age: Option<i32>
}

#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    pub id: i32,
    pub owner_id: i32,
    pub status: PhotoStatus,
    pub test_type: TestType,
    pub created_at: DateTime<FixedOffset>,
    pub expires_at: DateTime<FixedOffset>,
    pub target_gender: Option<Gender>,
    pub target_age_min: Option<i32>,
    pub target_age_max: Option<i32>,
    // Populated in the db query (joined from the photo's aggregate)
    pub rating_count: i32
}

/// One accepted rating submission. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmission {
    pub rater_id: i32,
    pub photo_id: i32,
    pub attraction: i32,
    pub trust: i32,
    pub intelligence: i32,
    pub submitted_at: DateTime<FixedOffset>
}

/// Running statistics over every axis score a rater has ever given.
/// Statistics are only treated as reliable once `ratings_given` reaches
/// the configured minimum; below it the rater is scored as neutral.
#[derive(Debug, Clone, Serialize)]
pub struct RaterProfile {
    pub rater_id: i32,
    pub mean_given: f64,
    pub std_dev_given: f64,
    pub ratings_given: i32
}

impl RaterProfile {
    /// A profile as it exists before the rater's first submission.
    pub fn empty(rater_id: i32) -> RaterProfile {
        RaterProfile {
            rater_id,
            mean_given: 0.0,
            std_dev_given: 0.0,
            ratings_given: 0
        }
    }
}

/// Per-photo weighted running means. Mutated on every accepted rating,
/// frozen once the photo expires or is deleted.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoAggregate {
    pub photo_id: i32,
    pub attraction_mean: f64,
    pub trust_mean: f64,
    pub intelligence_mean: f64,
    pub total_weight: f64,
    pub rating_count: i32,
    pub confidence: f64
}

impl PhotoAggregate {
    /// An aggregate as created when a photo is approved for rating.
    pub fn empty(photo_id: i32) -> PhotoAggregate {
        PhotoAggregate {
            photo_id,
            attraction_mean: 0.0,
            trust_mean: 0.0,
            intelligence_mean: 0.0,
            total_weight: 0.0,
            rating_count: 0,
            confidence: 0.0
        }
    }
}

/// Bounded, regenerating karma balance. The row in the store is the
/// single source of truth for "can this user act now".
#[derive(Debug, Clone, Serialize)]
pub struct KarmaAccount {
    pub user_id: i32,
    pub karma: i32,
    pub last_regen_at: DateTime<FixedOffset>
}
