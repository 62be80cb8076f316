use std::sync::Arc;

use cinebook_shared::{Patron, Showtime, Ticket, TicketEvent, TicketEventType};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::policy;
use crate::repository::{EventSink, PatronDirectory, SeatClaim, ShowtimeDirectory, TicketStore};
use crate::{Entity, ReservationError, ReservationResult};

/// Books, cancels and moves seats.
///
/// The engine keeps no state between calls. Every operation reads current truth
/// from the [`TicketStore`], commits through the store's atomic write path, and
/// only then appends one [`TicketEvent`] to the [`EventSink`].
pub struct ReservationEngine {
    showtimes: Arc<dyn ShowtimeDirectory>,
    patrons: Arc<dyn PatronDirectory>,
    tickets: Arc<dyn TicketStore>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl ReservationEngine {
    pub fn new(
        showtimes: Arc<dyn ShowtimeDirectory>,
        patrons: Arc<dyn PatronDirectory>,
        tickets: Arc<dyn TicketStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            showtimes,
            patrons,
            tickets,
            events,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn get_all_tickets(&self) -> ReservationResult<Vec<Ticket>> {
        info!("Fetching all tickets");
        Ok(self.tickets.list_tickets().await?)
    }

    pub async fn get_ticket_by_id(&self, ticket_id: Uuid) -> ReservationResult<Option<Ticket>> {
        info!("Fetching ticket with ID: {}", ticket_id);
        Ok(self.tickets.get_ticket(ticket_id).await?)
    }

    pub async fn get_tickets_by_patron(&self, patron_id: Uuid) -> ReservationResult<Vec<Ticket>> {
        info!("Fetching all tickets for patron: {}", patron_id);
        Ok(self.tickets.tickets_for_patron(patron_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn book_seat(
        &self,
        showtime_id: Uuid,
        patron_id: Uuid,
        seat_number: i32,
        price: f64,
    ) -> ReservationResult<Ticket> {
        info!(
            "Attempting to book seat {} for patron {} at showtime {} (price {})",
            seat_number, patron_id, showtime_id, price
        );

        let showtime = self.resolve_showtime(showtime_id).await?;
        let patron = self.resolve_patron(patron_id).await?;
        let now = self.clock.now();

        policy::validate_seat(&showtime, seat_number)?;
        policy::ensure_window_open(&showtime, now)?;

        if self
            .tickets
            .ticket_exists(showtime.id, seat_number, None)
            .await?
        {
            warn!(
                "Booking failed. Seat {} is already booked for showtime {}",
                seat_number, showtime.id
            );
            return Err(ReservationError::SeatTaken {
                showtime_id: showtime.id,
                seat: seat_number,
            });
        }

        let overlapping = self
            .tickets
            .find_overlapping(patron.id, &showtime.window)
            .await?;
        if let Some(existing) = overlapping.first() {
            warn!(
                "Booking failed. Patron {} already holds ticket {} for overlapping showtime {}",
                patron.id, existing.id, existing.showtime_id
            );
            return Err(ReservationError::OverlappingBooking {
                patron_id: patron.id,
                conflicting_showtime_id: existing.showtime_id,
            });
        }

        let claim = SeatClaim {
            ticket: Ticket::new(showtime.id, patron.id, seat_number, price, now),
            window: showtime.window,
        };
        let ticket = self.tickets.create_ticket(&claim).await.map_err(|err| {
            warn!(
                "Booking of seat {} for showtime {} lost at commit: {}",
                seat_number, showtime.id, err
            );
            ReservationError::from(err)
        })?;

        let details = format!(
            "Patron {} booked seat {} for showtime {}",
            patron.id, ticket.seat_number, showtime.id
        );
        self.record(TicketEventType::Booked, Some(ticket.id), ticket.id, details)
            .await?;

        info!(
            "Ticket booked successfully. Ticket ID: {}, Price: {}",
            ticket.id, ticket.price
        );
        Ok(ticket)
    }

    /// Returns `Ok(false)` when there is no such ticket.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_ticket(&self, ticket_id: Uuid) -> ReservationResult<bool> {
        info!("Attempting to cancel ticket with ID: {}", ticket_id);

        let Some(ticket) = self.tickets.get_ticket(ticket_id).await? else {
            warn!("Cancellation failed. Ticket with ID {} not found", ticket_id);
            return Ok(false);
        };

        let showtime = self.resolve_showtime(ticket.showtime_id).await?;
        policy::ensure_window_open(&showtime, self.clock.now())?;

        // Snapshot before the row disappears; the event cannot reference it afterwards.
        let details = format!(
            "Patron {} cancelled ticket {} (seat {}) for showtime {}",
            ticket.patron_id, ticket.id, ticket.seat_number, showtime.id
        );

        if !self.tickets.delete_ticket(ticket.id).await? {
            warn!("Ticket {} was cancelled concurrently", ticket.id);
            return Ok(false);
        }

        self.record(TicketEventType::Cancelled, None, ticket.id, details)
            .await?;

        info!("Ticket {} cancelled", ticket.id);
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_seat(
        &self,
        ticket_id: Uuid,
        new_seat_number: i32,
    ) -> ReservationResult<Ticket> {
        info!(
            "Attempting to change seat for ticket ID: {} to seat: {}",
            ticket_id, new_seat_number
        );

        let ticket = self.tickets.get_ticket(ticket_id).await?.ok_or_else(|| {
            warn!("Seat change failed. Ticket with ID {} not found", ticket_id);
            ReservationError::not_found(Entity::Ticket, ticket_id)
        })?;

        let showtime = self.resolve_showtime(ticket.showtime_id).await?;
        policy::validate_seat(&showtime, new_seat_number)?;
        policy::ensure_window_open(&showtime, self.clock.now())?;

        if self
            .tickets
            .ticket_exists(showtime.id, new_seat_number, Some(ticket.id))
            .await?
        {
            warn!(
                "Seat change failed. Seat {} is already booked for showtime {}",
                new_seat_number, showtime.id
            );
            return Err(ReservationError::SeatTaken {
                showtime_id: showtime.id,
                seat: new_seat_number,
            });
        }

        let previous_seat = ticket.seat_number;
        let updated = self
            .tickets
            .update_ticket_seat(ticket.id, new_seat_number)
            .await?
            .ok_or_else(|| {
                warn!("Ticket {} was cancelled during seat change", ticket.id);
                ReservationError::not_found(Entity::Ticket, ticket.id)
            })?;

        let details = format!(
            "Seat changed from {} to {} for showtime {}",
            previous_seat, updated.seat_number, showtime.id
        );
        self.record(TicketEventType::SeatChanged, Some(updated.id), updated.id, details)
            .await?;

        info!(
            "Seat change successful. Ticket ID: {} now has seat {}",
            updated.id, updated.seat_number
        );
        Ok(updated)
    }

    async fn resolve_showtime(&self, showtime_id: Uuid) -> ReservationResult<Showtime> {
        self.showtimes
            .resolve_showtime(showtime_id)
            .await
            .map_err(ReservationError::Backend)?
            .ok_or_else(|| {
                warn!("Showtime {} not found", showtime_id);
                ReservationError::not_found(Entity::Showtime, showtime_id)
            })
    }

    async fn resolve_patron(&self, patron_id: Uuid) -> ReservationResult<Patron> {
        self.patrons
            .resolve_patron(patron_id)
            .await
            .map_err(ReservationError::Backend)?
            .ok_or_else(|| {
                warn!("Patron {} not found", patron_id);
                ReservationError::not_found(Entity::Patron, patron_id)
            })
    }

    /// Appends the audit event for a mutation that has already committed.
    async fn record(
        &self,
        event_type: TicketEventType,
        ticket_ref: Option<Uuid>,
        subject: Uuid,
        details: String,
    ) -> ReservationResult<()> {
        let event = TicketEvent::new(event_type, ticket_ref, details, self.clock.now());
        if let Err(source) = self.events.append(&event).await {
            error!(
                "Failed to log {} event for ticket {}: {}",
                event_type, subject, source
            );
            return Err(ReservationError::AuditWriteFailed {
                event_type,
                ticket_id: subject,
                source,
            });
        }
        info!("Event logged: {} for ticket ID: {}", event_type, subject);
        Ok(())
    }
}
