use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketEventType {
    Booked,
    Cancelled,
    SeatChanged,
}

impl TicketEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketEventType::Booked => "booked",
            TicketEventType::Cancelled => "cancelled",
            TicketEventType::SeatChanged => "seat_changed",
        }
    }
}

impl fmt::Display for TicketEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ticket event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

impl FromStr for TicketEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(TicketEventType::Booked),
            "cancelled" => Ok(TicketEventType::Cancelled),
            "seat_changed" => Ok(TicketEventType::SeatChanged),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

/// Immutable audit record of a booking action.
///
/// `ticket_id` is `None` when the ticket no longer exists at the time the event is
/// written (cancellation); `details` then carries a snapshot of what was removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketEvent {
    pub id: Uuid,
    pub event_type: TicketEventType,
    pub ticket_id: Option<Uuid>,
    pub event_time: DateTime<Utc>,
    pub details: String,
}

impl TicketEvent {
    pub fn new(
        event_type: TicketEventType,
        ticket_id: Option<Uuid>,
        details: impl Into<String>,
        event_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            ticket_id,
            event_time,
            details: details.into(),
        }
    }

    /// Key used when the event is published to a partitioned log.
    pub fn partition_key(&self) -> String {
        self.ticket_id.unwrap_or(self.id).to_string()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
