use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A live reservation binding one patron to one seat for one showtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub showtime_id: Uuid,
    pub patron_id: Uuid,
    pub seat_number: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        showtime_id: Uuid,
        patron_id: Uuid,
        seat_number: i32,
        price: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            showtime_id,
            patron_id,
            seat_number,
            price,
            created_at,
        }
    }
}
