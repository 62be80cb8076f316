pub mod models;

pub use models::events::{TicketEvent, TicketEventType, UnknownEventType};
pub use models::screening::{Hall, Patron, ScreeningWindow, Showtime};
pub use models::ticket::Ticket;
