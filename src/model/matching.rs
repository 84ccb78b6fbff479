use crate::{
    database::db_structs::{Photo, Rater},
    model::{skip_cache::SkipCache, structures::photo_status::PhotoStatus}
};
use chrono::{DateTime, FixedOffset};
use std::collections::HashSet;

/// Picks the next photo to show a rater from a candidate snapshot.
///
/// Fairness policy: fewest-rated first, ties broken by oldest first, so
/// under-rated photos accumulate ratings before popular ones accumulate
/// more. Returns `None` when nothing is eligible; that is a legitimate
/// outcome for the caller ("come back later"), not an error.
///
/// The candidate query may pre-apply the durable filters, but eligibility
/// is re-checked here in full: the snapshot is advisory and two selectors
/// may race (the duplicate check on submission is the real gate).
pub fn select_next<'a>(
    rater: &Rater,
    candidates: &'a [Photo],
    already_rated: &HashSet<i32>,
    skips: &SkipCache,
    now: DateTime<FixedOffset>
) -> Option<&'a Photo> {
    candidates
        .iter()
        .filter(|photo| is_eligible(rater, photo, already_rated, skips, now))
        .min_by(|a, b| {
            a.rating_count
                .cmp(&b.rating_count)
                .then(a.created_at.cmp(&b.created_at))
        })
}

/// All filters must hold: ownership, moderation status, expiry, dedup,
/// session skips, and premium targeting.
pub fn is_eligible(
    rater: &Rater,
    photo: &Photo,
    already_rated: &HashSet<i32>,
    skips: &SkipCache,
    now: DateTime<FixedOffset>
) -> bool {
    photo.owner_id != rater.id
        && photo.status == PhotoStatus::Approved
        && photo.expires_at > now
        && !already_rated.contains(&photo.id)
        && !skips.contains(rater.id, photo.id, now)
        && targeting_matches(rater, photo)
}

/// Premium targeting predicate. Untargeted photos always match; a
/// targeted photo requires the rater to carry a satisfying attribute
/// (an unknown attribute never satisfies a constraint).
fn targeting_matches(rater: &Rater, photo: &Photo) -> bool {
    if let Some(target_gender) = photo.target_gender {
        match rater.gender {
            Some(gender) if gender == target_gender => {}
            _ => return false
        }
    }

    if let Some(age_min) = photo.target_age_min {
        match rater.age {
            Some(age) if age >= age_min => {}
            _ => return false
        }
    }

    if let Some(age_max) = photo.target_age_max {
        match rater.age {
            Some(age) if age <= age_max => {}
            _ => return false
        }
    }

    true
}
