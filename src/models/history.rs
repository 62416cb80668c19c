use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use crate::database::Database;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HistoryEntry {
    pub order_id: i64,
    pub movie_title: String,
    pub seats: Option<String>,
    pub total_seats: i64,
    pub date: NaiveDate,
    pub time: String,
    pub cinema: String,
    pub total: i64,
    pub paid: bool,
}

impl HistoryEntry {
    pub async fn for_user(user_id: i64, db: &Database) -> Result<Vec<HistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT o.id AS order_id,
                   m.title AS movie_title,
                   STRING_AGG(st.code, ', ' ORDER BY st.code) AS seats,
                   COUNT(os.seat_id) AS total_seats,
                   s.date,
                   t.name AS time,
                   c.name AS cinema,
                   o.total,
                   o.paid
            FROM orders o
            JOIN schedule s ON s.id = o.schedule_id
            JOIN movies m ON m.id = s.movie_id
            JOIN cinema c ON c.id = s.cinema_id
            JOIN show_time t ON t.id = s.time_id
            LEFT JOIN order_seat os ON os.order_id = o.id
            LEFT JOIN seats st ON st.id = os.seat_id
            WHERE o.user_id = $1
            GROUP BY o.id, m.title, s.date, t.name, c.name
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&db.pool)
        .await
    }
}
