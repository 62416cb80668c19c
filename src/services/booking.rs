//! Booking transaction coordinator.
//!
//! One booking is one store transaction: resolve the venue price, insert the
//! order, then lock, link and flip every requested seat in ascending id order.
//! Any failure rolls the whole unit back; nothing is retried here.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use validator::ValidateEmail;

use crate::error::BookingError;
use crate::models::{BookedOrder, NewOrder};
use crate::services::store::{BookingStore, BookingTx};

/// Input of a booking attempt. `user_id` comes from the authenticated caller.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub schedule_id: i64,
    pub seat_ids: Vec<i64>,
    pub user_id: i64,
    pub payment_id: i64,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Started,
    PriceResolved,
    OrderInserted,
    SeatsLinked(usize),
    Committed,
    Aborted,
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingPhase::Started => f.write_str("started"),
            BookingPhase::PriceResolved => f.write_str("price_resolved"),
            BookingPhase::OrderInserted => f.write_str("order_inserted"),
            BookingPhase::SeatsLinked(n) => write!(f, "seats_linked({n})"),
            BookingPhase::Committed => f.write_str("committed"),
            BookingPhase::Aborted => f.write_str("aborted"),
        }
    }
}

const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

pub struct BookingService<S> {
    store: Arc<S>,
}

impl<S> Clone for BookingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Committed availability of one seat, read without locking.
    pub async fn check_available(&self, seat_id: i64) -> Result<bool, BookingError> {
        self.store.seat_available(seat_id).await
    }

    pub async fn book(&self, request: BookingRequest) -> Result<BookedOrder, BookingError> {
        let seat_ids = normalize_seat_ids(&request.seat_ids)?;
        validate_buyer(&request)?;

        let schedule_id = request.schedule_id;
        let mut tx = self.store.begin().await?;
        let mut phase = BookingPhase::Started;

        match run(&mut tx, &request, &seat_ids, &mut phase).await {
            Ok(Some(booked)) => {
                tx.commit().await.inspect_err(|err| {
                    log_abort(err, phase, schedule_id, seat_ids.len());
                })?;
                phase = BookingPhase::Committed;
                info!(
                    order_id = booked.order.id,
                    schedule_id,
                    phase = %phase,
                    seat_count = booked.seat_ids.len(),
                    total = booked.order.total,
                    "Booking committed"
                );
                Ok(booked)
            }
            Ok(None) => {
                // Same user and key already committed an order.
                tx.rollback().await?;
                let key = request.idempotency_key.as_deref().unwrap_or_default();
                match self
                    .store
                    .find_order_by_idempotency_key(request.user_id, key)
                    .await?
                {
                    Some(existing) if !same_booking(&existing, &request, &seat_ids) => {
                        warn!(
                            order_id = existing.order.id,
                            user_id = request.user_id,
                            "Idempotency key reused for a different booking"
                        );
                        Err(BookingError::InvalidArgument(
                            "idempotency key was already used for a different booking".into(),
                        ))
                    }
                    Some(existing) => {
                        info!(
                            order_id = existing.order.id,
                            user_id = request.user_id,
                            "Booking replayed for idempotency key"
                        );
                        Ok(existing)
                    }
                    None => Err(BookingError::Internal(
                        "idempotency key reported as used but no order found".into(),
                    )),
                }
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed booking failed");
                }
                log_abort(&err, phase, schedule_id, seat_ids.len());
                Err(err)
            }
        }
    }
}

/// A replay must ask for the same showing, seats and payment as the stored order.
fn same_booking(existing: &BookedOrder, request: &BookingRequest, seat_ids: &[i64]) -> bool {
    existing.order.schedule_id == request.schedule_id
        && existing.order.payment_id == request.payment_id
        && existing.seat_ids == seat_ids
}

async fn run<T: BookingTx>(
    tx: &mut T,
    request: &BookingRequest,
    seat_ids: &[i64],
    phase: &mut BookingPhase,
) -> Result<Option<BookedOrder>, BookingError> {
    let unit_price = tx.schedule_price(request.schedule_id).await?;
    *phase = BookingPhase::PriceResolved;

    let total = order_total(unit_price, seat_ids.len())?;
    let new_order = NewOrder {
        schedule_id: request.schedule_id,
        user_id: request.user_id,
        payment_id: request.payment_id,
        total,
        fullname: request.fullname.trim().to_string(),
        email: request.email.clone(),
        phone: request.phone.trim().to_string(),
        idempotency_key: request.idempotency_key.clone(),
    };

    let Some(order) = tx.insert_order(&new_order).await? else {
        return Ok(None);
    };
    *phase = BookingPhase::OrderInserted;
    debug!(order_id = order.id, total, "Order inserted");

    for (linked, &seat_id) in seat_ids.iter().enumerate() {
        if !tx.lock_seat(seat_id).await? {
            return Err(BookingError::SeatUnavailable { seat_id });
        }
        tx.link_seat(order.id, seat_id).await?;
        tx.mark_unavailable(seat_id).await?;
        *phase = BookingPhase::SeatsLinked(linked + 1);
    }

    Ok(Some(BookedOrder {
        order,
        seat_ids: seat_ids.to_vec(),
        replayed: false,
    }))
}

fn log_abort(err: &BookingError, phase: BookingPhase, schedule_id: i64, seat_count: usize) {
    let aborted_at = phase.to_string();
    match err {
        BookingError::SeatUnavailable { seat_id } => info!(
            schedule_id,
            seat_id,
            seat_count,
            phase = %aborted_at,
            "Booking aborted: seat already taken"
        ),
        BookingError::Conflict(constraint) => error!(
            schedule_id,
            seat_count,
            phase = %aborted_at,
            constraint = %constraint,
            "Booking aborted: seat linked twice despite row lock"
        ),
        BookingError::TransientStoreFailure(reason) => warn!(
            schedule_id,
            seat_count,
            phase = %aborted_at,
            reason = %reason,
            "Booking aborted: transient store failure"
        ),
        BookingError::Internal(reason) => error!(
            schedule_id,
            seat_count,
            phase = %aborted_at,
            reason = %reason,
            "Booking aborted"
        ),
        other => info!(
            schedule_id,
            seat_count,
            phase = %aborted_at,
            error = %other,
            "Booking rejected"
        ),
    }
    debug!(phase = %BookingPhase::Aborted, "Booking transaction rolled back");
}

/// Sorted seat ids, rejecting empty, non-positive and repeated ones. Ascending order is the global lock order.
pub fn normalize_seat_ids(seat_ids: &[i64]) -> Result<Vec<i64>, BookingError> {
    if seat_ids.is_empty() {
        return Err(BookingError::InvalidArgument(
            "at least one seat must be requested".into(),
        ));
    }
    if let Some(bad) = seat_ids.iter().find(|id| **id <= 0) {
        return Err(BookingError::InvalidArgument(format!(
            "seat id {bad} is not valid"
        )));
    }

    let mut sorted = seat_ids.to_vec();
    sorted.sort_unstable();
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(BookingError::InvalidArgument(format!(
            "seat {} is requested more than once",
            pair[0]
        )));
    }
    Ok(sorted)
}

pub fn order_total(unit_price: i64, seat_count: usize) -> Result<i64, BookingError> {
    let total = i64::try_from(seat_count)
        .ok()
        .and_then(|count| unit_price.checked_mul(count))
        .ok_or_else(|| BookingError::InvalidArgument("order total is out of range".into()))?;

    if total <= 0 {
        return Err(BookingError::InvalidArgument(
            "order total must be positive".into(),
        ));
    }
    Ok(total)
}

fn validate_buyer(request: &BookingRequest) -> Result<(), BookingError> {
    if request.schedule_id <= 0 {
        return Err(BookingError::InvalidArgument("schedule id is not valid".into()));
    }
    if request.payment_id <= 0 {
        return Err(BookingError::InvalidArgument("payment id is not valid".into()));
    }
    if request.fullname.trim().is_empty() {
        return Err(BookingError::InvalidArgument("fullname is required".into()));
    }
    if request.phone.trim().is_empty() {
        return Err(BookingError::InvalidArgument("phone is required".into()));
    }
    if !request.email.validate_email() {
        return Err(BookingError::InvalidArgument("email is not valid".into()));
    }
    if let Some(key) = &request.idempotency_key {
        if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(BookingError::InvalidArgument(
                "idempotency key must be 1-255 bytes".into(),
            ));
        }
    }
    Ok(())
}
