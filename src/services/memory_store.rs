//! In-process [`BookingStore`].
//!
//! Mirrors the Postgres semantics the coordinator relies on: one async mutex
//! per seat row stands in for `SELECT ... FOR UPDATE`, writes are staged in the
//! transaction and published on commit (read committed), and foreign keys plus
//! the `order_seat.seat_id` uniqueness are checked on write.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::BookingError;
use crate::models::{BookedOrder, NewOrder, Order};
use crate::services::store::{BookingStore, BookingTx};

type RowLock = Arc<AsyncMutex<()>>;

#[derive(Default)]
struct Tables {
    schedule_prices: HashMap<i64, i64>,
    seats: BTreeMap<i64, bool>,
    users: HashSet<i64>,
    payments: HashSet<i64>,
    orders: BTreeMap<i64, Order>,
    idempotency_keys: HashMap<(i64, String), i64>,
    order_seats: Vec<(i64, i64)>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    seat_locks: Mutex<HashMap<i64, RowLock>>,
    key_locks: Mutex<HashMap<(i64, String), RowLock>>,
    next_order_id: AtomicI64,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        guard(&self.tables)
    }

    fn seat_lock(&self, seat_id: i64) -> RowLock {
        guard(&self.seat_locks).entry(seat_id).or_default().clone()
    }

    fn key_lock(&self, key: &(i64, String)) -> RowLock {
        guard(&self.key_locks).entry(key.clone()).or_default().clone()
    }
}

/// Held idempotency-key lock. The map entry goes away with the last holder.
struct KeyGuard {
    store: Arc<Inner>,
    key: (i64, String),
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut locks = guard(&self.store.key_locks);
        let unused = locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if unused {
            locks.remove(&self.key);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryBookingStore {
    inner: Arc<Inner>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule(self, schedule_id: i64, unit_price: i64) -> Self {
        self.inner.tables().schedule_prices.insert(schedule_id, unit_price);
        self
    }

    pub fn with_seats(self, seat_ids: impl IntoIterator<Item = i64>) -> Self {
        {
            let mut tables = self.inner.tables();
            for seat_id in seat_ids {
                tables.seats.insert(seat_id, true);
            }
        }
        self
    }

    pub fn with_user(self, user_id: i64) -> Self {
        self.inner.tables().users.insert(user_id);
        self
    }

    pub fn with_payment(self, payment_id: i64) -> Self {
        self.inner.tables().payments.insert(payment_id);
        self
    }

    /// Committed orders, ascending by id.
    pub fn orders(&self) -> Vec<Order> {
        self.inner.tables().orders.values().cloned().collect()
    }

    /// Committed `(order_id, seat_id)` links.
    pub fn order_seats(&self) -> Vec<(i64, i64)> {
        self.inner.tables().order_seats.clone()
    }

    /// Idempotency keys with a lock entry still allocated.
    pub fn pending_key_locks(&self) -> usize {
        guard(&self.inner.key_locks).len()
    }

    /// Seat ids whose committed flag is false.
    pub fn unavailable_seats(&self) -> Vec<i64> {
        self.inner
            .tables()
            .seats
            .iter()
            .filter(|(_, available)| !**available)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    type Tx = MemoryBookingTx;

    async fn begin(&self) -> Result<MemoryBookingTx, BookingError> {
        Ok(MemoryBookingTx {
            store: self.inner.clone(),
            seat_guards: BTreeMap::new(),
            key_guard: None,
            order: None,
            links: Vec::new(),
            taken: Vec::new(),
        })
    }

    async fn seat_available(&self, seat_id: i64) -> Result<bool, BookingError> {
        self.inner
            .tables()
            .seats
            .get(&seat_id)
            .copied()
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
        let tables = self.inner.tables();
        let Some(order_id) = tables.idempotency_keys.get(&(user_id, key.to_string())) else {
            return Ok(None);
        };
        let Some(order) = tables.orders.get(order_id).cloned() else {
            return Ok(None);
        };

        let mut seat_ids: Vec<i64> = tables
            .order_seats
            .iter()
            .filter(|(oid, _)| *oid == order.id)
            .map(|(_, sid)| *sid)
            .collect();
        seat_ids.sort_unstable();

        Ok(Some(BookedOrder {
            order,
            seat_ids,
            replayed: true,
        }))
    }
}

/// Unit of work over [`MemoryBookingStore`]. Dropping it is a rollback.
pub struct MemoryBookingTx {
    store: Arc<Inner>,
    seat_guards: BTreeMap<i64, OwnedMutexGuard<()>>,
    key_guard: Option<KeyGuard>,
    order: Option<(Order, Option<String>)>,
    links: Vec<(i64, i64)>,
    taken: Vec<i64>,
}

#[async_trait]
impl BookingTx for MemoryBookingTx {
    async fn schedule_price(&mut self, schedule_id: i64) -> Result<i64, BookingError> {
        self.store
            .tables()
            .schedule_prices
            .get(&schedule_id)
            .copied()
            .ok_or(BookingError::NotFound {
                entity: "schedule",
                id: schedule_id,
            })
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>, BookingError> {
        if self.order.is_some() {
            return Err(BookingError::Internal(
                "order already inserted in this transaction".into(),
            ));
        }

        {
            let tables = self.store.tables();
            if !tables.schedule_prices.contains_key(&order.schedule_id) {
                return Err(BookingError::ConstraintViolation("orders_schedule_id_fkey".into()));
            }
            if !tables.users.contains(&order.user_id) {
                return Err(BookingError::ConstraintViolation("orders_user_id_fkey".into()));
            }
            if !tables.payments.contains(&order.payment_id) {
                return Err(BookingError::ConstraintViolation("orders_payment_id_fkey".into()));
            }
        }

        if let Some(key) = &order.idempotency_key {
            let scoped = (order.user_id, key.clone());
            let lock = self.store.key_lock(&scoped);
            self.key_guard = Some(KeyGuard {
                store: self.store.clone(),
                key: scoped,
                held: Some(lock.lock_owned().await),
            });

            let tables = self.store.tables();
            if tables
                .idempotency_keys
                .contains_key(&(order.user_id, key.clone()))
            {
                return Ok(None);
            }
        }

        let id = self.store.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = order.clone().into_order(id);
        self.order = Some((created.clone(), order.idempotency_key.clone()));
        Ok(Some(created))
    }

    async fn lock_seat(&mut self, seat_id: i64) -> Result<bool, BookingError> {
        if !self.store.tables().seats.contains_key(&seat_id) {
            return Err(BookingError::NotFound {
                entity: "seat",
                id: seat_id,
            });
        }

        if !self.seat_guards.contains_key(&seat_id) {
            let lock = self.store.seat_lock(seat_id);
            let held = lock.lock_owned().await;
            self.seat_guards.insert(seat_id, held);
        }

        if self.taken.contains(&seat_id) {
            return Ok(false);
        }
        Ok(self.store.tables().seats.get(&seat_id).copied().unwrap_or(false))
    }

    async fn link_seat(&mut self, order_id: i64, seat_id: i64) -> Result<(), BookingError> {
        match &self.order {
            Some((order, _)) if order.id == order_id => {}
            _ => return Err(BookingError::ConstraintViolation("order_seat_order_id_fkey".into())),
        }

        let already_linked = self.links.iter().any(|(_, sid)| *sid == seat_id)
            || self
                .store
                .tables()
                .order_seats
                .iter()
                .any(|(_, sid)| *sid == seat_id);
        if already_linked {
            return Err(BookingError::Conflict("uq_order_seat_seat".into()));
        }

        self.links.push((order_id, seat_id));
        Ok(())
    }

    async fn mark_unavailable(&mut self, seat_id: i64) -> Result<(), BookingError> {
        if !self.seat_guards.contains_key(&seat_id) {
            return Err(BookingError::Internal(format!(
                "seat {seat_id} updated without holding its row lock"
            )));
        }
        self.taken.push(seat_id);
        Ok(())
    }

    async fn commit(self) -> Result<(), BookingError> {
        {
            let mut tables = self.store.tables();
            if let Some((order, key)) = &self.order {
                if let Some(key) = key {
                    tables
                        .idempotency_keys
                        .insert((order.user_id, key.clone()), order.id);
                }
                tables.orders.insert(order.id, order.clone());
            }
            tables.order_seats.extend(self.links.iter().copied());
            for seat_id in &self.taken {
                tables.seats.insert(*seat_id, false);
            }
        }
        // Row locks are released only after the writes are published.
        drop(self.seat_guards);
        drop(self.key_guard);
        Ok(())
    }

    async fn rollback(self) -> Result<(), BookingError> {
        Ok(())
    }
}
