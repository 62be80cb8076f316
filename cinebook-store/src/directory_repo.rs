use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinebook_core::{BoxError, PatronDirectory, ShowtimeDirectory};
use cinebook_shared::{Hall, Patron, ScreeningWindow, Showtime};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct ShowtimeRow {
    id: Uuid,
    movie_id: Uuid,
    venue_id: Uuid,
    hall_id: Uuid,
    capacity: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl From<ShowtimeRow> for Showtime {
    fn from(row: ShowtimeRow) -> Self {
        Showtime {
            id: row.id,
            movie_id: row.movie_id,
            venue_id: row.venue_id,
            hall: Hall {
                id: row.hall_id,
                capacity: row.capacity,
            },
            window: ScreeningWindow::new(row.start_time, row.end_time),
        }
    }
}

pub struct PgShowtimeDirectory {
    pool: PgPool,
}

impl PgShowtimeDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShowtimeDirectory for PgShowtimeDirectory {
    async fn resolve_showtime(&self, id: Uuid) -> Result<Option<Showtime>, BoxError> {
        let row = sqlx::query_as::<_, ShowtimeRow>(
            r#"
            SELECT s.id, s.movie_id, s.venue_id, h.id AS hall_id, h.capacity, s.start_time, s.end_time
            FROM showtimes s
            JOIN halls h ON h.id = s.hall_id
            WHERE s.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Showtime::from))
    }
}

#[derive(sqlx::FromRow)]
struct PatronRow {
    id: Uuid,
    name: String,
    email: String,
}

pub struct PgPatronDirectory {
    pool: PgPool,
}

impl PgPatronDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatronDirectory for PgPatronDirectory {
    async fn resolve_patron(&self, id: Uuid) -> Result<Option<Patron>, BoxError> {
        let row = sqlx::query_as::<_, PatronRow>("SELECT id, name, email FROM patrons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Patron {
            id: r.id,
            name: r.name,
            email: r.email,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_showtime_row_mapping() {
        let start = Utc::now();
        let row = ShowtimeRow {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            hall_id: Uuid::new_v4(),
            capacity: 120,
            start_time: start,
            end_time: start + Duration::hours(2),
        };
        let hall_id = row.hall_id;

        let showtime = Showtime::from(row);
        assert_eq!(showtime.hall.id, hall_id);
        assert_eq!(showtime.capacity(), 120);
        assert_eq!(showtime.starts_at(), start);
        assert_eq!(showtime.window.end, start + Duration::hours(2));
    }
}
