pub mod events;
pub mod screening;
pub mod ticket;
