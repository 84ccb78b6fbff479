use super::db_structs::{KarmaAccount, Photo, PhotoAggregate, Rater, RaterProfile, RatingSubmission};
use crate::{
    model::{
        config::EngineConfig,
        engine::RatingEngine,
        error::EngineError,
        karma,
        skip_cache::SkipCache,
        structures::{gender::Gender, photo_status::PhotoStatus, test_type::TestType},
        tracker::ReplayTracker
    },
    utils::progress_utils::progress_bar
};
use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use postgres_types::ToSql;
use std::{collections::HashSet, sync::Arc};
use tokio_postgres::{Client, Error, NoTls, Row};
use tracing::{error, info, warn};

/// How many pre-filtered photos the matching query hands to the
/// in-process selector per request.
const CANDIDATE_POOL_SIZE: i64 = 64;

#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    pub async fn get_rater(&self, user_id: i32) -> Result<Option<Rater>, Error> {
        let row = self
            .client
            .query_opt("SELECT id, gender, age FROM users WHERE id = $1", &[&user_id])
            .await?;

        Ok(row.map(|row| Self::rater_from_row(&row)))
    }

    /// Fetches every photo with its current rating count, oldest first.
    /// Used to seed the replay tracker; expired and frozen photos are
    /// included because their aggregates are rebuilt too.
    pub async fn get_photos(&self) -> Result<Vec<Photo>, Error> {
        info!("Fetching photos...");
        let rows = self
            .client
            .query(
                "SELECT p.id, p.owner_id, p.status, p.test_type, p.created_at, p.expires_at, \
                 p.target_gender, p.target_age_min, p.target_age_max, \
                 COALESCE(a.rating_count, 0) AS rating_count \
                 FROM photos p \
                 LEFT JOIN photo_aggregates a ON a.photo_id = p.id \
                 ORDER BY p.created_at, p.id",
                &[]
            )
            .await?;

        let photos = rows.iter().map(Self::photo_from_row).collect_vec();

        info!("Fetched {} photos", photos.len());
        Ok(photos)
    }

    /// The full durable rating log in submission order. Replaying in
    /// this order reproduces each profile snapshot exactly as it stood
    /// when the rating was accepted.
    pub async fn get_rating_log(&self) -> Result<Vec<RatingSubmission>, Error> {
        info!("Fetching rating log...");
        let rows = self
            .client
            .query(
                "SELECT rater_id, photo_id, attraction, trust, intelligence, submitted_at \
                 FROM ratings \
                 ORDER BY submitted_at, rater_id, photo_id",
                &[]
            )
            .await?;

        let log = rows.iter().map(Self::submission_from_row).collect_vec();

        info!("Fetched {} ratings", log.len());
        Ok(log)
    }

    pub async fn get_rater_profile(&self, rater_id: i32) -> Result<Option<RaterProfile>, Error> {
        let row = self
            .client
            .query_opt(
                "SELECT rater_id, mean_given, std_dev_given, ratings_given \
                 FROM rater_profiles WHERE rater_id = $1",
                &[&rater_id]
            )
            .await?;

        Ok(row.map(|row| Self::profile_from_row(&row)))
    }

    pub async fn get_karma_account(&self, user_id: i32) -> Result<Option<KarmaAccount>, Error> {
        let row = self
            .client
            .query_opt(
                "SELECT user_id, karma, last_regen_at FROM karma_accounts WHERE user_id = $1",
                &[&user_id]
            )
            .await?;

        Ok(row.map(|row| Self::karma_from_row(&row)))
    }

    /// Creates the karma account with the starting balance when a user
    /// account is created. Safe to call twice.
    pub async fn create_karma_account(
        &self,
        user_id: i32,
        now: DateTime<FixedOffset>,
        config: &EngineConfig
    ) -> Result<(), Error> {
        let values: &[&(dyn ToSql + Sync)] = &[&user_id, &config.starting_karma, &now];

        self.client
            .execute(
                "INSERT INTO karma_accounts (user_id, karma, last_regen_at) \
                 VALUES ($1, $2, $3) ON CONFLICT (user_id) DO NOTHING",
                values
            )
            .await?;

        Ok(())
    }

    /// Photo ids this rater has already rated, for the selector's dedup
    /// filter.
    pub async fn already_rated_photo_ids(&self, rater_id: i32) -> Result<HashSet<i32>, Error> {
        let rows = self
            .client
            .query("SELECT photo_id FROM ratings WHERE rater_id = $1", &[&rater_id])
            .await?;

        Ok(rows.iter().map(|row| row.get("photo_id")).collect())
    }

    /// Pre-filters eligible photos in SQL, fewest-rated then oldest.
    /// Advisory only: the in-process selector re-checks every filter and
    /// the submission path enforces the duplicate gate.
    pub async fn candidate_photos(
        &self,
        rater: &Rater,
        now: DateTime<FixedOffset>,
        limit: i64
    ) -> Result<Vec<Photo>, Error> {
        let gender = rater.gender.map(|g| g as i32);
        let rows = self
            .client
            .query(
                "SELECT p.id, p.owner_id, p.status, p.test_type, p.created_at, p.expires_at, \
                 p.target_gender, p.target_age_min, p.target_age_max, \
                 COALESCE(a.rating_count, 0) AS rating_count \
                 FROM photos p \
                 LEFT JOIN photo_aggregates a ON a.photo_id = p.id \
                 WHERE p.owner_id <> $1 \
                   AND p.status = $2 \
                   AND p.expires_at > $3 \
                   AND NOT EXISTS (SELECT 1 FROM ratings r WHERE r.photo_id = p.id AND r.rater_id = $1) \
                   AND (p.target_gender IS NULL OR p.target_gender = $4) \
                   AND (p.target_age_min IS NULL OR $5 >= p.target_age_min) \
                   AND (p.target_age_max IS NULL OR $5 <= p.target_age_max) \
                 ORDER BY rating_count, p.created_at \
                 LIMIT $6",
                &[
                    &rater.id,
                    &(PhotoStatus::Approved as i32),
                    &now,
                    &gender,
                    &rater.age,
                    &limit
                ]
            )
            .await?;

        Ok(rows.iter().map(Self::photo_from_row).collect_vec())
    }

    /// Fetches a candidate pool and runs the selector over it. `None`
    /// means the pool is exhausted for this rater right now.
    pub async fn next_photo(
        &self,
        engine: &RatingEngine,
        rater: &Rater,
        skips: &SkipCache,
        now: DateTime<FixedOffset>
    ) -> Result<Option<Photo>, EngineError> {
        let (candidates, already_rated) = futures::try_join!(
            self.candidate_photos(rater, now, CANDIDATE_POOL_SIZE),
            self.already_rated_photo_ids(rater.id)
        )?;

        Ok(engine
            .select_next(rater, &candidates, &already_rated, skips, now)
            .cloned())
    }

    /// Accepts one rating as a single transaction: duplicate-guarded
    /// insert, karma debit, profile fold, and the aggregate update.
    /// Nothing is applied partially; any rejection rolls the whole
    /// submission back.
    pub async fn submit_rating(
        &self,
        engine: &RatingEngine,
        submission: &RatingSubmission,
        karma_cost: i32
    ) -> Result<PhotoAggregate, EngineError> {
        engine.validate(submission)?;

        self.client.batch_execute("BEGIN").await?;

        match self.submit_rating_in_tx(engine, submission, karma_cost).await {
            Ok(aggregate) => {
                self.client.batch_execute("COMMIT").await?;
                Ok(aggregate)
            }
            Err(e) => {
                if let Err(rollback_err) = self.client.batch_execute("ROLLBACK").await {
                    warn!("rollback after failed submission also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn submit_rating_in_tx(
        &self,
        engine: &RatingEngine,
        submission: &RatingSubmission,
        karma_cost: i32
    ) -> Result<PhotoAggregate, EngineError> {
        // The photo must still be open for rating at acceptance time
        let photo_row = self
            .client
            .query_opt(
                "SELECT status, expires_at FROM photos WHERE id = $1",
                &[&submission.photo_id]
            )
            .await?
            .ok_or(EngineError::NotFound {
                entity: "photo",
                id: submission.photo_id
            })?;

        let status = PhotoStatus::try_from(photo_row.get::<_, i32>("status"));
        let expires_at: DateTime<FixedOffset> = photo_row.get("expires_at");
        if status != Ok(PhotoStatus::Approved) || expires_at <= submission.submitted_at {
            return Err(EngineError::PhotoNotRateable {
                photo_id: submission.photo_id
            });
        }

        // Duplicate gate. The matching query is advisory, so two raters
        // may race to the same photo; the same rater racing themselves
        // lands here and is rejected, not silently ignored.
        let inserted = self
            .client
            .execute(
                "INSERT INTO ratings (rater_id, photo_id, attraction, trust, intelligence, submitted_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (rater_id, photo_id) DO NOTHING",
                &[
                    &submission.rater_id,
                    &submission.photo_id,
                    &submission.attraction,
                    &submission.trust,
                    &submission.intelligence,
                    &submission.submitted_at
                ]
            )
            .await?;

        if inserted == 0 {
            return Err(EngineError::DuplicateRating {
                rater_id: submission.rater_id,
                photo_id: submission.photo_id
            });
        }

        if karma_cost > 0 {
            self.debit_karma(submission.rater_id, karma_cost).await?;
        }

        // Materialize and lock the profile row so two in-flight
        // submissions from the same rater serialize their folds
        self.client
            .execute(
                "INSERT INTO rater_profiles (rater_id, mean_given, std_dev_given, ratings_given) \
                 VALUES ($1, 0, 0, 0) ON CONFLICT (rater_id) DO NOTHING",
                &[&submission.rater_id]
            )
            .await?;

        let profile_row = self
            .client
            .query_one(
                "SELECT rater_id, mean_given, std_dev_given, ratings_given \
                 FROM rater_profiles WHERE rater_id = $1 FOR UPDATE",
                &[&submission.rater_id]
            )
            .await?;
        let mut profile = Self::profile_from_row(&profile_row);

        // Normalization uses the profile as it stood before this
        // submission; the fold lands afterwards
        let normalized = engine.process(&profile, submission);
        engine.record_submission(&mut profile, submission);

        self.client
            .execute(
                "UPDATE rater_profiles SET mean_given = $2, std_dev_given = $3, ratings_given = $4 \
                 WHERE rater_id = $1",
                &[
                    &profile.rater_id,
                    &profile.mean_given,
                    &profile.std_dev_given,
                    &profile.ratings_given
                ]
            )
            .await?;

        // One-statement weighted-mean fold: concurrent ratings on the
        // same photo serialize on the row and neither update is lost
        let aggregate_row = self
            .client
            .query_opt(
                "UPDATE photo_aggregates SET \
                 attraction_mean = (attraction_mean * total_weight + $2 * $5) / (total_weight + $5), \
                 trust_mean = (trust_mean * total_weight + $3 * $5) / (total_weight + $5), \
                 intelligence_mean = (intelligence_mean * total_weight + $4 * $5) / (total_weight + $5), \
                 total_weight = total_weight + $5, \
                 rating_count = rating_count + 1, \
                 confidence = 1 - exp(-$6 * (rating_count + 1)) \
                 WHERE photo_id = $1 \
                 RETURNING photo_id, attraction_mean, trust_mean, intelligence_mean, \
                 total_weight, rating_count, confidence",
                &[
                    &submission.photo_id,
                    &normalized.attraction,
                    &normalized.trust,
                    &normalized.intelligence,
                    &normalized.weight,
                    &engine.config().confidence_rate
                ]
            )
            .await?
            .ok_or(EngineError::NotFound {
                entity: "photo aggregate",
                id: submission.photo_id
            })?;

        Ok(Self::aggregate_from_row(&aggregate_row))
    }

    /// Conditional decrement; the row is the single source of truth for
    /// whether the user can act. Never drives the balance below zero.
    pub async fn debit_karma(&self, user_id: i32, amount: i32) -> Result<KarmaAccount, EngineError> {
        let row = self
            .client
            .query_opt(
                "UPDATE karma_accounts SET karma = karma - $2 \
                 WHERE user_id = $1 AND karma >= $2 \
                 RETURNING user_id, karma, last_regen_at",
                &[&user_id, &amount]
            )
            .await?;

        match row {
            Some(row) => Ok(Self::karma_from_row(&row)),
            None => {
                let account = self
                    .get_karma_account(user_id)
                    .await?
                    .ok_or(EngineError::NotFound {
                        entity: "karma account",
                        id: user_id
                    })?;

                Err(EngineError::InsufficientKarma {
                    current: account.karma,
                    required: amount
                })
            }
        }
    }

    /// Regeneration as one conditional update; interval and cap are
    /// enforced in the statement itself so retries are idempotent.
    pub async fn regenerate_karma(
        &self,
        user_id: i32,
        now: DateTime<FixedOffset>,
        config: &EngineConfig
    ) -> Result<KarmaAccount, EngineError> {
        let cutoff = now - config.regen_interval;
        let row = self
            .client
            .query_opt(
                "UPDATE karma_accounts SET karma = LEAST(karma + $2, $3), last_regen_at = $4 \
                 WHERE user_id = $1 AND karma < $3 AND last_regen_at <= $5 \
                 RETURNING user_id, karma, last_regen_at",
                &[&user_id, &config.regen_amount, &config.max_karma, &now, &cutoff]
            )
            .await?;

        match row {
            Some(row) => Ok(Self::karma_from_row(&row)),
            None => {
                let account = self
                    .get_karma_account(user_id)
                    .await?
                    .ok_or(EngineError::NotFound {
                        entity: "karma account",
                        id: user_id
                    })?;

                if account.karma >= config.max_karma {
                    Err(EngineError::KarmaFull {
                        current: account.karma
                    })
                } else {
                    Err(EngineError::RegenTooEarly {
                        remaining_minutes: karma::remaining_wait_minutes(&account, now, config)
                    })
                }
            }
        }
    }

    /// Replaces the derived tables with the tracker's rebuilt state.
    /// The rating log itself is never touched.
    pub async fn save_recomputed(&self, tracker: &ReplayTracker) -> Result<(), EngineError> {
        self.client.batch_execute("BEGIN").await?;

        match self.save_recomputed_in_tx(tracker).await {
            Ok(()) => {
                self.client.batch_execute("COMMIT").await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = self.client.batch_execute("ROLLBACK").await {
                    warn!("rollback after failed save also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn save_recomputed_in_tx(&self, tracker: &ReplayTracker) -> Result<(), EngineError> {
        self.truncate_table("photo_aggregates").await?;
        self.truncate_table("rater_profiles").await?;

        let p_bar = progress_bar(
            (tracker.aggregate_count() + tracker.profile_count()) as u64,
            "Saving recomputed state".to_string()
        );

        let mut aggregate_values: Vec<String> = Vec::new();
        for aggregate in tracker.aggregates() {
            aggregate_values.push(format!(
                "({}, {}, {}, {}, {}, {}, {})",
                aggregate.photo_id,
                aggregate.attraction_mean,
                aggregate.trust_mean,
                aggregate.intelligence_mean,
                aggregate.total_weight,
                aggregate.rating_count,
                aggregate.confidence
            ));
            if let Some(bar) = &p_bar {
                bar.inc(1);
            }
        }

        if aggregate_values.is_empty() {
            warn!("No photo aggregates to save");
        } else {
            let query = format!(
                "INSERT INTO photo_aggregates (photo_id, attraction_mean, trust_mean, \
                 intelligence_mean, total_weight, rating_count, confidence) VALUES {}",
                aggregate_values.join(", ")
            );
            self.client.execute(query.as_str(), &[]).await?;
        }

        let mut profile_values: Vec<String> = Vec::new();
        for profile in tracker.profiles() {
            profile_values.push(format!(
                "({}, {}, {}, {})",
                profile.rater_id, profile.mean_given, profile.std_dev_given, profile.ratings_given
            ));
            if let Some(bar) = &p_bar {
                bar.inc(1);
            }
        }

        if profile_values.is_empty() {
            warn!("No rater profiles to save");
        } else {
            let query = format!(
                "INSERT INTO rater_profiles (rater_id, mean_given, std_dev_given, ratings_given) VALUES {}",
                profile_values.join(", ")
            );
            self.client.execute(query.as_str(), &[]).await?;
        }

        if let Some(bar) = p_bar {
            bar.finish_with_message("Recomputed state saved");
        }

        Ok(())
    }

    async fn truncate_table(&self, table: &str) -> Result<(), Error> {
        self.client
            .execute(format!("TRUNCATE TABLE {}", table).as_str(), &[])
            .await?;

        info!("Truncated the {} table", table);
        Ok(())
    }

    fn rater_from_row(row: &Row) -> Rater {
        Rater {
            id: row.get("id"),
            gender: row
                .get::<_, Option<i32>>("gender")
                .and_then(|g| Gender::try_from(g).ok()),
            age: row.get("age")
        }
    }

    fn photo_from_row(row: &Row) -> Photo {
        Photo {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            status: PhotoStatus::try_from(row.get::<_, i32>("status")).unwrap(),
            test_type: TestType::try_from(row.get::<_, i32>("test_type")).unwrap(),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            target_gender: row
                .get::<_, Option<i32>>("target_gender")
                .and_then(|g| Gender::try_from(g).ok()),
            target_age_min: row.get("target_age_min"),
            target_age_max: row.get("target_age_max"),
            rating_count: row.get("rating_count")
        }
    }

    fn submission_from_row(row: &Row) -> RatingSubmission {
        RatingSubmission {
            rater_id: row.get("rater_id"),
            photo_id: row.get("photo_id"),
            attraction: row.get("attraction"),
            trust: row.get("trust"),
            intelligence: row.get("intelligence"),
            submitted_at: row.get("submitted_at")
        }
    }

    fn profile_from_row(row: &Row) -> RaterProfile {
        RaterProfile {
            rater_id: row.get("rater_id"),
            mean_given: row.get("mean_given"),
            std_dev_given: row.get("std_dev_given"),
            ratings_given: row.get("ratings_given")
        }
    }

    fn karma_from_row(row: &Row) -> KarmaAccount {
        KarmaAccount {
            user_id: row.get("user_id"),
            karma: row.get("karma"),
            last_regen_at: row.get("last_regen_at")
        }
    }

    // Access the underlying Client
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }
}
