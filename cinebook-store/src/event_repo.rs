use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinebook_core::{BoxError, EventHistory, EventSink};
use cinebook_shared::{TicketEvent, TicketEventType};
use sqlx::PgPool;
use uuid::Uuid;

/// Audit trail in the `ticket_events` table. Rows are only ever inserted.
pub struct PgEventSink {
    pool: PgPool,
}

impl PgEventSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketEventRow {
    id: Uuid,
    event_type: String,
    ticket_id: Option<Uuid>,
    event_time: DateTime<Utc>,
    details: String,
}

impl TryFrom<TicketEventRow> for TicketEvent {
    type Error = BoxError;

    fn try_from(row: TicketEventRow) -> Result<Self, Self::Error> {
        Ok(TicketEvent {
            id: row.id,
            event_type: row.event_type.parse::<TicketEventType>()?,
            ticket_id: row.ticket_id,
            event_time: row.event_time,
            details: row.details,
        })
    }
}

#[async_trait]
impl EventSink for PgEventSink {
    async fn append(&self, event: &TicketEvent) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO ticket_events (id, event_type, ticket_id, event_time, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id)
        .bind(event.event_type.as_str())
        .bind(event.ticket_id)
        .bind(event.event_time)
        .bind(&event.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHistory for PgEventSink {
    async fn list_events(&self) -> Result<Vec<TicketEvent>, BoxError> {
        let rows = sqlx::query_as::<_, TicketEventRow>(
            "SELECT id, event_type, ticket_id, event_time, details FROM ticket_events ORDER BY event_time, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketEvent::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event_type: &str) -> TicketEventRow {
        TicketEventRow {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            ticket_id: None,
            event_time: Utc::now(),
            details: "Patron cancelled ticket".to_string(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let event = TicketEvent::try_from(row("cancelled")).unwrap();
        assert_eq!(event.event_type, TicketEventType::Cancelled);
        assert_eq!(event.ticket_id, None);
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        assert!(TicketEvent::try_from(row("ticket_deleted")).is_err());
    }
}
