use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::Database;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub code: String,
    #[serde(rename = "available")]
    pub is_available: bool,
}

impl Seat {
    /// Seating chart for a schedule; `None` when the schedule does not exist.
    pub async fn for_schedule(
        schedule_id: i64,
        db: &Database,
    ) -> Result<Option<Vec<Seat>>, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM schedule WHERE id = $1)",
        )
        .bind(schedule_id)
        .fetch_one(&db.pool)
        .await?;

        if !exists {
            return Ok(None);
        }

        let seats = sqlx::query_as::<_, Seat>(
            "SELECT id, code, is_available FROM seats ORDER BY id",
        )
        .fetch_all(&db.pool)
        .await?;

        Ok(Some(seats))
    }
}
