use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use engine::{HttpLedgerApi, LedgerConfig, SyncOptions};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budgetsync={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.ledger.timeout_secs))
        .build()?;
    let ledger = HttpLedgerApi::new(
        client,
        LedgerConfig {
            base_url: settings.ledger.base_url,
            token_url: settings.ledger.token_url,
            client_id: settings.ledger.client_id,
            client_secret: settings.ledger.client_secret,
        },
    );

    let scheduler = settings.scheduler;
    let engine = engine::Engine::builder()
        .database(db)
        .ledger(Arc::new(ledger))
        .options(SyncOptions {
            batch_size: scheduler.batch_size,
            max_concurrent_users: scheduler.max_concurrent_users,
            max_concurrent_budgets: scheduler.max_concurrent_budgets,
            min_sync_interval: TimeDelta::minutes(scheduler.min_sync_interval_mins),
        })
        .build()
        .await?;

    tracing::info!(
        interval_secs = scheduler.interval_secs,
        batch_size = scheduler.batch_size,
        "sync scheduler started"
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(scheduler.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = engine.run_due_batch(Utc::now()).await {
                    tracing::error!("sync batch failed: {err}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
