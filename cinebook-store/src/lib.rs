pub mod app_config;
pub mod database;
pub mod directory_repo;
pub mod event_repo;
pub mod events;
pub mod ticket_repo;

pub use database::DbClient;
pub use directory_repo::{PgPatronDirectory, PgShowtimeDirectory};
pub use event_repo::PgEventSink;
pub use events::FanoutEventSink;
#[cfg(feature = "kafka")]
pub use events::KafkaEventSink;
pub use ticket_repo::PgTicketStore;

use cinebook_core::{BoxError, EventSink, ReservationEngine};
use std::sync::Arc;

/// Wires an engine whose every collaborator lives in the given database.
///
/// With the `kafka` feature and a `[kafka]` section, events are also published
/// to the configured topic after they are written to Postgres.
pub fn postgres_engine(
    db: &DbClient,
    config: &app_config::Config,
) -> Result<ReservationEngine, BoxError> {
    let pool = db.pool.clone();
    #[cfg_attr(not(feature = "kafka"), allow(unused_mut))]
    let mut sinks: Vec<Arc<dyn EventSink>> =
        vec![Arc::new(PgEventSink::new(pool.clone())) as Arc<dyn EventSink>];

    #[cfg(feature = "kafka")]
    if let Some(kafka) = &config.kafka {
        tracing::info!("Publishing ticket events to {} on {}", kafka.topic, kafka.brokers);
        sinks.push(Arc::new(KafkaEventSink::new(kafka)?));
    }

    Ok(ReservationEngine::new(
        Arc::new(PgShowtimeDirectory::new(pool.clone())),
        Arc::new(PgPatronDirectory::new(pool.clone())),
        Arc::new(PgTicketStore::new(
            pool,
            config.reservations.max_commit_attempts,
        )),
        Arc::new(FanoutEventSink::new(sinks)),
    ))
}
