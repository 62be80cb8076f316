//! In-process collaborators backed by locked maps.
//!
//! The ticket store serializes every write behind a single lock, which makes the
//! seat-uniqueness and patron-overlap checks indivisible from the insert.

use async_trait::async_trait;
use cinebook_shared::{Patron, ScreeningWindow, Showtime, Ticket, TicketEvent};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::repository::{
    BoxError, EventHistory, EventSink, PatronDirectory, SeatClaim, ShowtimeDirectory, StoreError,
    StoreResult, TicketStore,
};

#[derive(Debug, Default)]
pub struct InMemoryShowtimeDirectory {
    showtimes: RwLock<HashMap<Uuid, Showtime>>,
}

impl InMemoryShowtimeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, showtime: Showtime) {
        let mut showtimes = self.showtimes.write().unwrap_or_else(|e| e.into_inner());
        showtimes.insert(showtime.id, showtime);
    }
}

#[async_trait]
impl ShowtimeDirectory for InMemoryShowtimeDirectory {
    async fn resolve_showtime(&self, id: Uuid) -> Result<Option<Showtime>, BoxError> {
        let showtimes = self
            .showtimes
            .read()
            .map_err(|_| "showtime directory lock poisoned")?;
        Ok(showtimes.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPatronDirectory {
    patrons: RwLock<HashMap<Uuid, Patron>>,
}

impl InMemoryPatronDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, patron: Patron) {
        let mut patrons = self.patrons.write().unwrap_or_else(|e| e.into_inner());
        patrons.insert(patron.id, patron);
    }
}

#[async_trait]
impl PatronDirectory for InMemoryPatronDirectory {
    async fn resolve_patron(&self, id: Uuid) -> Result<Option<Patron>, BoxError> {
        let patrons = self
            .patrons
            .read()
            .map_err(|_| "patron directory lock poisoned")?;
        Ok(patrons.get(&id).cloned())
    }
}

#[derive(Debug)]
struct StoredTicket {
    ticket: Ticket,
    window: ScreeningWindow,
}

#[derive(Debug, Default)]
struct Ledger {
    tickets: HashMap<Uuid, StoredTicket>,
    // (showtime_id, seat_number) -> ticket_id
    seats: HashMap<(Uuid, i32), Uuid>,
}

impl Ledger {
    fn overlapping<'a>(
        &'a self,
        patron_id: Uuid,
        window: &'a ScreeningWindow,
    ) -> impl Iterator<Item = &'a Ticket> + 'a {
        self.tickets
            .values()
            .filter(move |stored| {
                stored.ticket.patron_id == patron_id && stored.window.overlaps(window)
            })
            .map(|stored| &stored.ticket)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    ledger: Mutex<Ledger>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> StoreResult<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| StoreError::backend("ticket ledger lock poisoned"))
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let ledger = self.ledger()?;
        Ok(ledger.tickets.get(&id).map(|stored| stored.ticket.clone()))
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let ledger = self.ledger()?;
        let mut tickets: Vec<Ticket> = ledger
            .tickets
            .values()
            .map(|stored| stored.ticket.clone())
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }

    async fn tickets_for_patron(&self, patron_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let ledger = self.ledger()?;
        let mut tickets: Vec<Ticket> = ledger
            .tickets
            .values()
            .filter(|stored| stored.ticket.patron_id == patron_id)
            .map(|stored| stored.ticket.clone())
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }

    async fn ticket_exists(
        &self,
        showtime_id: Uuid,
        seat_number: i32,
        exclude_ticket: Option<Uuid>,
    ) -> StoreResult<bool> {
        let ledger = self.ledger()?;
        Ok(match ledger.seats.get(&(showtime_id, seat_number)) {
            Some(holder) => Some(*holder) != exclude_ticket,
            None => false,
        })
    }

    async fn find_overlapping(
        &self,
        patron_id: Uuid,
        window: &ScreeningWindow,
    ) -> StoreResult<Vec<Ticket>> {
        let ledger = self.ledger()?;
        Ok(ledger.overlapping(patron_id, window).cloned().collect())
    }

    async fn create_ticket(&self, claim: &SeatClaim) -> StoreResult<Ticket> {
        let ticket = &claim.ticket;
        let seat_key = (ticket.showtime_id, ticket.seat_number);
        let mut ledger = self.ledger()?;

        if ledger.seats.contains_key(&seat_key) {
            return Err(StoreError::SeatConflict {
                showtime_id: ticket.showtime_id,
                seat: ticket.seat_number,
            });
        }
        if let Some(existing) = ledger.overlapping(ticket.patron_id, &claim.window).next() {
            return Err(StoreError::OverlapConflict {
                patron_id: ticket.patron_id,
                showtime_id: existing.showtime_id,
            });
        }

        ledger.seats.insert(seat_key, ticket.id);
        ledger.tickets.insert(
            ticket.id,
            StoredTicket {
                ticket: ticket.clone(),
                window: claim.window,
            },
        );
        Ok(ticket.clone())
    }

    async fn update_ticket_seat(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
    ) -> StoreResult<Option<Ticket>> {
        let mut guard = self.ledger()?;
        let Ledger { tickets, seats } = &mut *guard;
        let Some(stored) = tickets.get_mut(&ticket_id) else {
            return Ok(None);
        };
        let showtime_id = stored.ticket.showtime_id;
        let new_key = (showtime_id, seat_number);

        if let Some(holder) = seats.get(&new_key) {
            if *holder != ticket_id {
                return Err(StoreError::SeatConflict {
                    showtime_id,
                    seat: seat_number,
                });
            }
        }

        seats.remove(&(showtime_id, stored.ticket.seat_number));
        seats.insert(new_key, ticket_id);
        stored.ticket.seat_number = seat_number;
        Ok(Some(stored.ticket.clone()))
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> StoreResult<bool> {
        let mut ledger = self.ledger()?;
        match ledger.tickets.remove(&ticket_id) {
            Some(stored) => {
                ledger
                    .seats
                    .remove(&(stored.ticket.showtime_id, stored.ticket.seat_number));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Append-only event log kept in memory
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<TicketEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for InMemoryEventLog {
    async fn append(&self, event: &TicketEvent) -> Result<(), BoxError> {
        let mut events = self.events.lock().map_err(|_| "event log lock poisoned")?;
        events.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl EventHistory for InMemoryEventLog {
    async fn list_events(&self) -> Result<Vec<TicketEvent>, BoxError> {
        let events = self.events.lock().map_err(|_| "event log lock poisoned")?;
        Ok(events.clone())
    }
}
