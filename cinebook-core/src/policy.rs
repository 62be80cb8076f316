//! Booking rules that do not depend on store state.

use chrono::{DateTime, Duration, Utc};
use cinebook_shared::Showtime;
use tracing::warn;

use crate::{ReservationError, ReservationResult};

/// No booking, cancellation or seat change inside this many hours before start.
pub const BOOKING_CUTOFF_HOURS: i64 = 3;

pub fn booking_cutoff() -> Duration {
    Duration::hours(BOOKING_CUTOFF_HOURS)
}

/// The window is still open exactly at the cutoff boundary and closes right after.
pub fn window_open(now: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
    now <= starts_at - booking_cutoff()
}

pub fn validate_seat(showtime: &Showtime, seat_number: i32) -> ReservationResult<()> {
    if showtime.hall.admits(seat_number) {
        return Ok(());
    }
    warn!(
        "Invalid seat number {} for showtime {}. Must be between 1 and {}",
        seat_number,
        showtime.id,
        showtime.capacity()
    );
    Err(ReservationError::InvalidSeat {
        seat: seat_number,
        capacity: showtime.capacity(),
    })
}

pub fn ensure_window_open(showtime: &Showtime, now: DateTime<Utc>) -> ReservationResult<()> {
    if window_open(now, showtime.starts_at()) {
        return Ok(());
    }
    warn!(
        "Showtime {} starts at {}; changes are closed within {} hours of start",
        showtime.id,
        showtime.starts_at(),
        BOOKING_CUTOFF_HOURS
    );
    Err(ReservationError::BookingWindowClosed {
        showtime_id: showtime.id,
        starts_at: showtime.starts_at(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinebook_shared::{Hall, ScreeningWindow};
    use uuid::Uuid;

    fn showtime_starting_at(start: DateTime<Utc>, capacity: i32) -> Showtime {
        Showtime {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            hall: Hall::new(capacity),
            window: ScreeningWindow::new(start, start + Duration::hours(2)),
        }
    }

    #[test]
    fn test_window_boundaries() {
        let start = Utc::now() + Duration::days(1);
        assert!(window_open(start - Duration::hours(4), start));
        assert!(window_open(start - Duration::hours(3), start));
        assert!(!window_open(start - Duration::hours(3) + Duration::seconds(1), start));
        assert!(!window_open(start - Duration::minutes(30), start));
        assert!(!window_open(start + Duration::minutes(30), start));
    }

    #[test]
    fn test_closed_window_reports_showtime() {
        let now = Utc::now();
        let showtime = showtime_starting_at(now + Duration::hours(2), 10);
        match ensure_window_open(&showtime, now) {
            Err(ReservationError::BookingWindowClosed { showtime_id, starts_at }) => {
                assert_eq!(showtime_id, showtime.id);
                assert_eq!(starts_at, showtime.starts_at());
            }
            other => panic!("expected closed window, got {other:?}"),
        }
    }

    #[test]
    fn test_seat_validation() {
        let showtime = showtime_starting_at(Utc::now() + Duration::days(2), 20);
        assert!(validate_seat(&showtime, 1).is_ok());
        assert!(validate_seat(&showtime, 20).is_ok());
        assert!(matches!(
            validate_seat(&showtime, 0),
            Err(ReservationError::InvalidSeat { seat: 0, capacity: 20 })
        ));
        assert!(matches!(
            validate_seat(&showtime, 21),
            Err(ReservationError::InvalidSeat { seat: 21, capacity: 20 })
        ));
    }
}
