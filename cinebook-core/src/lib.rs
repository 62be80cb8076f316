pub mod clock;
pub mod engine;
pub mod memory;
pub mod policy;
pub mod repository;

use chrono::{DateTime, Utc};
use cinebook_shared::TicketEventType;
use std::fmt;
use uuid::Uuid;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::ReservationEngine;
pub use repository::{
    BoxError, EventHistory, EventSink, PatronDirectory, SeatClaim, ShowtimeDirectory, StoreError,
    StoreResult, TicketStore,
};

/// What a `NotFound` failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Showtime,
    Patron,
    Ticket,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Showtime => f.write_str("Showtime"),
            Entity::Patron => f.write_str("Patron"),
            Entity::Ticket => f.write_str("Ticket"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: Uuid },

    #[error("Invalid seat number {seat}! Must be between 1 and {capacity}")]
    InvalidSeat { seat: i32, capacity: i32 },

    #[error("Booking window closed for showtime {showtime_id} starting at {starts_at}")]
    BookingWindowClosed {
        showtime_id: Uuid,
        starts_at: DateTime<Utc>,
    },

    #[error("Seat {seat} already booked for showtime {showtime_id}")]
    SeatTaken { showtime_id: Uuid, seat: i32 },

    #[error("Patron {patron_id} already has a booking during this time (showtime {conflicting_showtime_id})")]
    OverlappingBooking {
        patron_id: Uuid,
        conflicting_showtime_id: Uuid,
    },

    /// The ticket mutation committed but its audit event was not recorded.
    #[error("Ticket {ticket_id} committed but the {event_type} event was not recorded: {source}")]
    AuditWriteFailed {
        event_type: TicketEventType,
        ticket_id: Uuid,
        #[source]
        source: BoxError,
    },

    #[error("Backend failure: {0}")]
    Backend(#[source] BoxError),
}

impl ReservationError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        ReservationError::NotFound { entity, id }
    }
}

/// Commit-time conflicts surface exactly like the explicit pre-checks.
impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatConflict { showtime_id, seat } => {
                ReservationError::SeatTaken { showtime_id, seat }
            }
            StoreError::OverlapConflict {
                patron_id,
                showtime_id,
            } => ReservationError::OverlappingBooking {
                patron_id,
                conflicting_showtime_id: showtime_id,
            },
            StoreError::Backend(source) => ReservationError::Backend(source),
        }
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
