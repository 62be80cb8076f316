use anyhow::Context;
use cinebook_store::{app_config::Config, DbClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinebook_store=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        "Connecting to ticket database (max {} connections)",
        config.database.max_connections
    );

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to apply migrations")?;

    let engine = cinebook_store::postgres_engine(&db, &config)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to build reservation engine")?;
    let live = engine.get_all_tickets().await?.len();
    tracing::info!("Reservation schema ready; {} live tickets", live);

    Ok(())
}
