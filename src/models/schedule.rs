use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use crate::database::Database;

/// A screening as shown to a buyer choosing where and when to watch.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleListing {
    pub id: i64,
    pub movie_id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub cinema_id: i64,
    pub cinema: String,
    pub cinema_image: Option<String>,
    pub time: String,
    pub location: String,
    pub price: i64,
}

impl ScheduleListing {
    pub async fn for_movie(movie_id: i64, db: &Database) -> Result<Vec<ScheduleListing>, sqlx::Error> {
        sqlx::query_as::<_, ScheduleListing>(
            r#"
            SELECT s.id, s.movie_id, m.title, s.date,
                   c.id AS cinema_id, c.name AS cinema, c.image AS cinema_image,
                   t.name AS time, l.name AS location, c.price
            FROM schedule s
            JOIN movies m ON m.id = s.movie_id
            JOIN cinema c ON c.id = s.cinema_id
            JOIN show_time t ON t.id = s.time_id
            JOIN location l ON l.id = s.location_id
            WHERE s.movie_id = $1 AND m.is_deleted = FALSE
            ORDER BY s.date, t.name
            "#,
        )
        .bind(movie_id)
        .fetch_all(&db.pool)
        .await
    }
}
