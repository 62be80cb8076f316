use async_trait::async_trait;
use cinebook_shared::{Patron, ScreeningWindow, Showtime, Ticket, TicketEvent};
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read-only lookup of scheduled screenings
#[async_trait]
pub trait ShowtimeDirectory: Send + Sync {
    async fn resolve_showtime(&self, id: Uuid) -> Result<Option<Showtime>, BoxError>;
}

/// Read-only lookup of registered patrons
#[async_trait]
pub trait PatronDirectory: Send + Sync {
    async fn resolve_patron(&self, id: Uuid) -> Result<Option<Patron>, BoxError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Seat {seat} is already taken for showtime {showtime_id}")]
    SeatConflict { showtime_id: Uuid, seat: i32 },

    #[error("Patron {patron_id} already holds a ticket for overlapping showtime {showtime_id}")]
    OverlapConflict { patron_id: Uuid, showtime_id: Uuid },

    #[error("Ticket store backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A ticket about to be written, with the screening window of its showtime
/// so the store can re-check patron overlap inside the commit.
#[derive(Debug, Clone)]
pub struct SeatClaim {
    pub ticket: Ticket,
    pub window: ScreeningWindow,
}

/// Durable ticket storage.
///
/// `create_ticket` and `update_ticket_seat` are the atomic commit points: an
/// implementation must guarantee that no two live tickets ever share
/// `(showtime_id, seat_number)`, reporting the loser as
/// [`StoreError::SeatConflict`]. `create_ticket` must also refuse a ticket whose
/// window overlaps one of the same patron's live tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>>;

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>>;

    async fn tickets_for_patron(&self, patron_id: Uuid) -> StoreResult<Vec<Ticket>>;

    async fn ticket_exists(
        &self,
        showtime_id: Uuid,
        seat_number: i32,
        exclude_ticket: Option<Uuid>,
    ) -> StoreResult<bool>;

    /// Live tickets of `patron_id` whose showtime window overlaps `window`
    async fn find_overlapping(
        &self,
        patron_id: Uuid,
        window: &ScreeningWindow,
    ) -> StoreResult<Vec<Ticket>>;

    async fn create_ticket(&self, claim: &SeatClaim) -> StoreResult<Ticket>;

    /// Returns `None` if the ticket no longer exists.
    async fn update_ticket_seat(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
    ) -> StoreResult<Option<Ticket>>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_ticket(&self, ticket_id: Uuid) -> StoreResult<bool>;
}

/// Append-only destination for audit events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: &TicketEvent) -> Result<(), BoxError>;
}

/// Read side of the audit trail
#[async_trait]
pub trait EventHistory: Send + Sync {
    async fn list_events(&self) -> Result<Vec<TicketEvent>, BoxError>;
}
