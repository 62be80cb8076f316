use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinebook_core::{SeatClaim, StoreError, StoreResult, TicketStore};
use cinebook_shared::{ScreeningWindow, Ticket};
use sqlx::PgPool;
use std::future::Future;
use tracing::warn;
use uuid::Uuid;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres ticket store.
///
/// Seat uniqueness is the `tickets_showtime_seat_key` constraint, so a losing
/// writer is rejected by the database itself. Bookings additionally take a
/// transaction-scoped advisory lock on the patron before re-checking overlap,
/// which serializes one patron's concurrent bookings without touching anyone else.
pub struct PgTicketStore {
    pool: PgPool,
    max_commit_attempts: u32,
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    showtime_id: Uuid,
    patron_id: Uuid,
    seat_number: i32,
    price: f64,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            showtime_id: row.showtime_id,
            patron_id: row.patron_id,
            seat_number: row.seat_number,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

enum CommitError {
    Rejected(StoreError),
    Sql(sqlx::Error),
}

impl From<sqlx::Error> for CommitError {
    fn from(err: sqlx::Error) -> Self {
        CommitError::Sql(err)
    }
}

fn sql_state(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

fn is_transient(code: &str) -> bool {
    code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED
}

impl PgTicketStore {
    pub fn new(pool: PgPool, max_commit_attempts: u32) -> Self {
        Self {
            pool,
            max_commit_attempts: max_commit_attempts.max(1),
        }
    }

    /// Re-runs `op` while Postgres reports a transient conflict.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CommitError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(CommitError::Rejected(err)) => return Err(err),
                Err(CommitError::Sql(err)) => {
                    let transient = sql_state(&err).is_some_and(|code| is_transient(&code));
                    if transient && attempt < self.max_commit_attempts {
                        warn!(
                            "{} hit a transient conflict (attempt {}/{}): {}",
                            operation, attempt, self.max_commit_attempts, err
                        );
                        attempt += 1;
                        continue;
                    }
                    return Err(StoreError::backend(err));
                }
            }
        }
    }

    async fn try_create(&self, claim: &SeatClaim) -> Result<Ticket, CommitError> {
        let ticket = &claim.ticket;
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(ticket.patron_id.to_string())
            .execute(&mut *tx)
            .await?;

        let clash = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT t.showtime_id
            FROM tickets t
            JOIN showtimes s ON s.id = t.showtime_id
            WHERE t.patron_id = $1 AND s.start_time < $3 AND s.end_time > $2
            LIMIT 1
            "#,
        )
        .bind(ticket.patron_id)
        .bind(claim.window.start)
        .bind(claim.window.end)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(showtime_id) = clash {
            return Err(CommitError::Rejected(StoreError::OverlapConflict {
                patron_id: ticket.patron_id,
                showtime_id,
            }));
        }

        let inserted = sqlx::query_as::<_, TicketRow>(
            r#"
            INSERT INTO tickets (id, showtime_id, patron_id, seat_number, price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (showtime_id, seat_number) DO NOTHING
            RETURNING id, showtime_id, patron_id, seat_number, price, created_at
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.showtime_id)
        .bind(ticket.patron_id)
        .bind(ticket.seat_number)
        .bind(ticket.price)
        .bind(ticket.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            return Err(CommitError::Rejected(StoreError::SeatConflict {
                showtime_id: ticket.showtime_id,
                seat: ticket.seat_number,
            }));
        };

        tx.commit().await?;
        Ok(row.into())
    }

    async fn try_update_seat(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
    ) -> Result<Option<Ticket>, CommitError> {
        let mut tx = self.pool.begin().await?;

        let showtime_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT showtime_id FROM tickets WHERE id = $1 FOR UPDATE",
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(showtime_id) = showtime_id else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets SET seat_number = $2
            WHERE id = $1
            RETURNING id, showtime_id, patron_id, seat_number, price, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(seat_number)
        .fetch_one(&mut *tx)
        .await;

        let row = match updated {
            Ok(row) => row,
            Err(err) if sql_state(&err).as_deref() == Some(UNIQUE_VIOLATION) => {
                return Err(CommitError::Rejected(StoreError::SeatConflict {
                    showtime_id,
                    seat: seat_number,
                }));
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await?;
        Ok(Some(row.into()))
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT id, showtime_id, patron_id, seat_number, price, created_at FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(Ticket::from))
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT id, showtime_id, patron_id, seat_number, price, created_at FROM tickets ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn tickets_for_patron(&self, patron_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, showtime_id, patron_id, seat_number, price, created_at
            FROM tickets
            WHERE patron_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn ticket_exists(
        &self,
        showtime_id: Uuid,
        seat_number: i32,
        exclude_ticket: Option<Uuid>,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tickets
                WHERE showtime_id = $1 AND seat_number = $2
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(showtime_id)
        .bind(seat_number)
        .bind(exclude_ticket)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    async fn find_overlapping(
        &self,
        patron_id: Uuid,
        window: &ScreeningWindow,
    ) -> StoreResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT t.id, t.showtime_id, t.patron_id, t.seat_number, t.price, t.created_at
            FROM tickets t
            JOIN showtimes s ON s.id = t.showtime_id
            WHERE t.patron_id = $1 AND s.start_time < $3 AND s.end_time > $2
            "#,
        )
        .bind(patron_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn create_ticket(&self, claim: &SeatClaim) -> StoreResult<Ticket> {
        self.with_retry("create_ticket", || self.try_create(claim))
            .await
    }

    async fn update_ticket_seat(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
    ) -> StoreResult<Option<Ticket>> {
        self.with_retry("update_ticket_seat", || {
            self.try_update_seat(ticket_id, seat_number)
        })
        .await
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }
}
