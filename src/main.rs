use clap::Parser;
use ppr_engine::{
    args::Args,
    database::db::DbClient,
    messaging::{RabbitMqConfig, RabbitMqPublisher},
    model::{engine::RatingEngine, error::EngineError, tracker::ReplayTracker},
    utils::progress_utils::progress_bar
};
use tracing::{debug, error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level);

    let client = match DbClient::connect(&args.connection_string).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            error!("Application cannot start without a valid database connection");
            std::process::exit(1);
        }
    };

    let engine = RatingEngine::default();

    if let Err(e) = recompute(&client, &engine, args.dry_run).await {
        error!("Recompute failed: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}

/// Rebuilds every photo aggregate and rater profile from the durable
/// rating log. Replay order is submission order, so each rating is
/// normalized against the profile exactly as it stood at acceptance.
async fn recompute(client: &DbClient, engine: &RatingEngine, dry_run: bool) -> Result<(), EngineError> {
    let photos = client.get_photos().await?;
    let rating_log = client.get_rating_log().await?;

    let mut tracker = ReplayTracker::new();
    tracker.seed_photos(&photos);

    let bar = progress_bar(rating_log.len() as u64, "Replaying rating log".to_string());
    let mut skipped: u64 = 0;

    for submission in &rating_log {
        match tracker.apply(engine, submission) {
            Ok(_) => {}
            Err(e) if e.is_rejection() => {
                debug!("Skipping rating during replay: {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e)
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = bar {
        bar.finish_with_message("Replay complete");
    }

    if skipped > 0 {
        warn!("Skipped {} ratings during replay", skipped);
    }

    tracker.sort();
    info!(
        "Replayed {} ratings into {} aggregates across {} rater profiles",
        rating_log.len() as u64 - skipped,
        tracker.aggregate_count(),
        tracker.profile_count()
    );

    if dry_run {
        info!("Dry run requested; skipping save");
        return Ok(());
    }

    client.save_recomputed(&tracker).await?;
    info!("Recomputed state saved");

    publish_disclosed(engine, &tracker).await;

    Ok(())
}

/// Broadcasts a scored event for every photo whose aggregate is past the
/// disclosure threshold. Event delivery is best-effort; failures never
/// invalidate the recompute itself.
async fn publish_disclosed(engine: &RatingEngine, tracker: &ReplayTracker) {
    let config = match RabbitMqConfig::from_env() {
        Ok(config) if config.enabled => config,
        _ => {
            debug!("RabbitMQ publishing disabled; skipping scored events");
            return;
        }
    };

    let mut publisher = match RabbitMqPublisher::connect_from_config(&config).await {
        Ok(publisher) => publisher,
        Err(e) => {
            warn!("Could not connect to RabbitMQ, skipping scored events: {}", e);
            return;
        }
    };

    let mut published = 0;
    for aggregate in tracker.aggregates() {
        if !engine.scores_disclosed(aggregate) {
            continue;
        }

        match publisher
            .publish_photo_scored(
                aggregate.photo_id,
                aggregate.rating_count,
                aggregate.confidence,
                "recomputed",
                None
            )
            .await
        {
            Ok(()) => published += 1,
            Err(e) => warn!("Failed to publish scored event for photo {}: {}", aggregate.photo_id, e)
        }
    }

    info!("Published {} scored events", published);

    if let Err(e) = publisher.close().await {
        warn!("Failed to close RabbitMQ connection: {}", e);
    }
}
