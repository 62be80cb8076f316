use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Half-open screening interval `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScreeningWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Two windows overlap iff each one starts before the other ends.
    /// Windows that merely touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &ScreeningWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A physical screening room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hall {
    pub id: Uuid,
    pub capacity: i32,
}

impl Hall {
    pub fn new(capacity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            capacity,
        }
    }

    /// Seats are numbered `1..=capacity`.
    pub fn admits(&self, seat_number: i32) -> bool {
        seat_number >= 1 && seat_number <= self.capacity
    }
}

/// A scheduled screening, as resolved by the showtime directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Showtime {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub venue_id: Uuid,
    pub hall: Hall,
    pub window: ScreeningWindow,
}

impl Showtime {
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.window.start
    }

    pub fn capacity(&self) -> i32 {
        self.hall.capacity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patron {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
