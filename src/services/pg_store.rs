use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::BookingError;
use crate::models::{BookedOrder, NewOrder, Order};
use crate::services::store::{BookingStore, BookingTx};

/// Booking store backed by Postgres row locks.
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgBookingStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }
}

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingStore for PgBookingStore {
    type Tx = PgBookingTx;

    async fn begin(&self) -> Result<PgBookingTx, BookingError> {
        let mut tx = self.pool.begin().await.map_err(BookingError::from_sqlx)?;

        // Contended seat locks fail with 55P03 instead of waiting forever.
        if self.lock_timeout_ms > 0 {
            sqlx::query(&format!("SET LOCAL lock_timeout = {}", self.lock_timeout_ms))
                .execute(&mut *tx)
                .await
                .map_err(BookingError::from_sqlx)?;
        }

        Ok(PgBookingTx { tx })
    }

    async fn seat_available(&self, seat_id: i64) -> Result<bool, BookingError> {
        sqlx::query_scalar::<_, bool>("SELECT is_available FROM seats WHERE id = $1")
            .bind(seat_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(BookingError::from_sqlx)?
            .ok_or(BookingError::NotFound {
                entity: "seat",
                id: seat_id,
            })
    }

    async fn find_order_by_idempotency_key(
        &self,
        user_id: i64,
        key: &str,
    ) -> Result<Option<BookedOrder>, BookingError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, schedule_id, user_id, payment_id, total, fullname, email, phone, paid
            FROM orders
            WHERE user_id = $1 AND idempotency_key = $2
            "#,
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(BookingError::from_sqlx)?;

        let Some(order) = order else {
            return Ok(None);
        };

        let seat_ids = sqlx::query_scalar::<_, i64>(
            "SELECT seat_id FROM order_seat WHERE order_id = $1 ORDER BY seat_id",
        )
        .bind(order.id)
        .fetch_all(&self.pool)
        .await
        .map_err(BookingError::from_sqlx)?;

        Ok(Some(BookedOrder {
            order,
            seat_ids,
            replayed: true,
        }))
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn schedule_price(&mut self, schedule_id: i64) -> Result<i64, BookingError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT c.price
            FROM schedule s
            JOIN cinema c ON c.id = s.cinema_id
            WHERE s.id = $1
            "#,
        )
        .bind(schedule_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(BookingError::from_sqlx)?
        .ok_or(BookingError::NotFound {
            entity: "schedule",
            id: schedule_id,
        })
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>, BookingError> {
        // A concurrent insert with the same key blocks here until that
        // transaction ends; if it committed, no row comes back.
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (schedule_id, user_id, payment_id, total, fullname, email, phone, paid, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)
            ON CONFLICT ON CONSTRAINT uq_orders_user_idempotency DO NOTHING
            RETURNING id, schedule_id, user_id, payment_id, total, fullname, email, phone, paid
            "#,
        )
        .bind(order.schedule_id)
        .bind(order.user_id)
        .bind(order.payment_id)
        .bind(order.total)
        .bind(&order.fullname)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(order.idempotency_key.as_deref())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(BookingError::from_sqlx)
    }

    async fn lock_seat(&mut self, seat_id: i64) -> Result<bool, BookingError> {
        sqlx::query_scalar::<_, bool>("SELECT is_available FROM seats WHERE id = $1 FOR UPDATE")
            .bind(seat_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(BookingError::from_sqlx)?
            .ok_or(BookingError::NotFound {
                entity: "seat",
                id: seat_id,
            })
    }

    async fn link_seat(&mut self, order_id: i64, seat_id: i64) -> Result<(), BookingError> {
        sqlx::query("INSERT INTO order_seat (order_id, seat_id) VALUES ($1, $2)")
            .bind(order_id)
            .bind(seat_id)
            .execute(&mut *self.tx)
            .await
            .map_err(BookingError::from_sqlx)?;
        Ok(())
    }

    async fn mark_unavailable(&mut self, seat_id: i64) -> Result<(), BookingError> {
        let affected = sqlx::query("UPDATE seats SET is_available = FALSE WHERE id = $1")
            .bind(seat_id)
            .execute(&mut *self.tx)
            .await
            .map_err(BookingError::from_sqlx)?
            .rows_affected();

        if affected == 0 {
            return Err(BookingError::NotFound {
                entity: "seat",
                id: seat_id,
            });
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), BookingError> {
        self.tx.commit().await.map_err(BookingError::from_sqlx)
    }

    async fn rollback(self) -> Result<(), BookingError> {
        self.tx.rollback().await.map_err(BookingError::from_sqlx)
    }
}
