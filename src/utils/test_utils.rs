use crate::{
    database::db_structs::{KarmaAccount, Photo, Rater, RaterProfile, RatingSubmission},
    model::structures::{gender::Gender, photo_status::PhotoStatus, test_type::TestType}
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn generate_rater(id: i32, gender: Option<Gender>, age: Option<i32>) -> Rater {
    Rater { id, gender, age }
}

pub fn generate_rater_profile(rater_id: i32, mean: f64, std_dev: f64, ratings_given: i32) -> RaterProfile {
    RaterProfile {
        rater_id,
        mean_given: mean,
        std_dev_given: std_dev,
        ratings_given
    }
}

/// A free, untargeted, approved photo valid for another 30 days.
pub fn generate_photo(id: i32, owner_id: i32, rating_count: i32, created_at: DateTime<FixedOffset>) -> Photo {
    Photo {
        id,
        owner_id,
        status: PhotoStatus::Approved,
        test_type: TestType::Free,
        created_at,
        expires_at: Utc::now().fixed_offset() + Duration::days(30),
        target_gender: None,
        target_age_min: None,
        target_age_max: None,
        rating_count
    }
}

pub fn generate_targeted_photo(
    id: i32,
    owner_id: i32,
    target_gender: Option<Gender>,
    target_age_min: Option<i32>,
    target_age_max: Option<i32>,
    created_at: DateTime<FixedOffset>
) -> Photo {
    Photo {
        target_gender,
        target_age_min,
        target_age_max,
        test_type: TestType::Paid,
        ..generate_photo(id, owner_id, 0, created_at)
    }
}

pub fn generate_submission(rater_id: i32, photo_id: i32, attraction: i32, trust: i32, intelligence: i32) -> RatingSubmission {
    RatingSubmission {
        rater_id,
        photo_id,
        attraction,
        trust,
        intelligence,
        submitted_at: Utc::now().fixed_offset()
    }
}

pub fn generate_karma_account(user_id: i32, karma: i32, last_regen_at: DateTime<FixedOffset>) -> KarmaAccount {
    KarmaAccount {
        user_id,
        karma,
        last_regen_at
    }
}

/// A reproducible rating log: every rater rates every photo once, scores
/// drawn from a seeded RNG, timestamps spaced a minute apart.
pub fn generate_rating_log(rater_ids: &[i32], photo_ids: &[i32], seed: u64) -> Vec<RatingSubmission> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = Utc::now().fixed_offset() - Duration::days(7);
    let mut log = Vec::new();

    for (i, rater_id) in rater_ids.iter().enumerate() {
        for (j, photo_id) in photo_ids.iter().enumerate() {
            let offset = (i * photo_ids.len() + j) as i64;
            log.push(RatingSubmission {
                rater_id: *rater_id,
                photo_id: *photo_id,
                attraction: rng.random_range(1..=10),
                trust: rng.random_range(1..=10),
                intelligence: rng.random_range(1..=10),
                submitted_at: start + Duration::minutes(offset)
            });
        }
    }

    log
}
