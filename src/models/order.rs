use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A committed purchase. Immutable once the booking transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub schedule_id: i64,
    pub user_id: i64,
    pub payment_id: i64,
    pub total: i64,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub paid: bool,
}

/// Order row as it is inserted by the coordinator. `paid` always starts false.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub schedule_id: i64,
    pub user_id: i64,
    pub payment_id: i64,
    pub total: i64,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub idempotency_key: Option<String>,
}

impl NewOrder {
    pub fn into_order(self, id: i64) -> Order {
        Order {
            id,
            schedule_id: self.schedule_id,
            user_id: self.user_id,
            payment_id: self.payment_id,
            total: self.total,
            fullname: self.fullname,
            email: self.email,
            phone: self.phone,
            paid: false,
        }
    }
}

/// Result of a booking: the order plus the seats it claims.
#[derive(Debug, Clone, Serialize)]
pub struct BookedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub seat_ids: Vec<i64>,
    /// True when an earlier attempt with the same idempotency key is returned.
    #[serde(skip)]
    pub replayed: bool,
}
