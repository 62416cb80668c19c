use serde::Serialize;
use sqlx::FromRow;

use crate::database::Database;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
}

impl PaymentMethod {
    pub async fn all(db: &Database) -> Result<Vec<PaymentMethod>, sqlx::Error> {
        sqlx::query_as::<_, PaymentMethod>("SELECT id, name, image FROM payment_method ORDER BY id")
            .fetch_all(&db.pool)
            .await
    }
}
