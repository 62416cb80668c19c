//! Transactional storage seam for the booking core.
//!
//! A [`BookingStore`] hands out [`BookingTx`] units of work. Everything done
//! through a `BookingTx` becomes visible to other readers only after
//! [`BookingTx::commit`]; dropping it or calling [`BookingTx::rollback`]
//! discards all of it.

use async_trait::async_trait;

use crate::error::BookingError;
use crate::models::{BookedOrder, NewOrder, Order};

#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    type Tx: BookingTx;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Tx, BookingError>;

    /// Lock-free read of a seat's committed availability flag.
    async fn seat_available(&self, seat_id: i64) -> Result<bool, BookingError>;

    /// Committed order previously created by `user_id` under `key`, with its seats.
    async fn find_order_by_idempotency_key(
        &self,
        user_id: i64,
        key: &str,
    ) -> Result<Option<BookedOrder>, BookingError>;
}

#[async_trait]
pub trait BookingTx: Send {
    /// Per-seat price of the schedule's venue. `NotFound` for unknown schedules.
    async fn schedule_price(&mut self, schedule_id: i64) -> Result<i64, BookingError>;

    /// Inserts the order with a generated id.
    ///
    /// Returns `Ok(None)` when the same user already committed an order under the
    /// same idempotency key. Waits for an in-flight attempt holding that key first.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>, BookingError>;

    /// Takes the exclusive row lock on the seat, held until commit or rollback,
    /// and returns its availability as seen under that lock.
    async fn lock_seat(&mut self, seat_id: i64) -> Result<bool, BookingError>;

    /// Records that `order_id` claims `seat_id`. `Conflict` if the seat is already linked.
    async fn link_seat(&mut self, order_id: i64, seat_id: i64) -> Result<(), BookingError>;

    /// Flips the seat flag to unavailable. The seat must be locked by this unit.
    async fn mark_unavailable(&mut self, seat_id: i64) -> Result<(), BookingError>;

    async fn commit(self) -> Result<(), BookingError>;

    async fn rollback(self) -> Result<(), BookingError>;
}
