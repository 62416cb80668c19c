//! Booking coordinator against real Postgres row locks.
//!
//! Each test gets a fresh database with `src/migrations` applied
//! (requires `DATABASE_URL`).

use std::time::Duration;

use cinema_booking::error::BookingError;
use cinema_booking::models::NewOrder;
use cinema_booking::services::{
    BookingRequest, BookingService, BookingStore, BookingTx, PgBookingStore,
};
use futures::future::join_all;
use sqlx::PgPool;

const UNIT_PRICE: i64 = 50_000;

async fn seed(pool: &PgPool) {
    for statement in [
        "INSERT INTO users (id, email, password, role) VALUES
            (1, 'buyer@example.com', 'x', 'User'),
            (2, 'desk@example.com', 'x', 'User')",
        "INSERT INTO movies (id, title, release_date) VALUES (1, 'Night Train', '2025-01-01')",
        "INSERT INTO cinema (id, name, price) VALUES (1, 'Studio 1', 50000)",
        "INSERT INTO location (id, name) VALUES (1, 'Jakarta')",
        "INSERT INTO schedule (id, movie_id, cinema_id, time_id, location_id, date)
            VALUES (1, 1, 1, 1, 1, '2025-02-01')",
        "INSERT INTO seats (id, code) SELECT g, 'S' || g FROM generate_series(1, 40) AS g",
    ] {
        sqlx::query(statement).execute(pool).await.unwrap();
    }
}

async fn service(pool: &PgPool) -> BookingService<PgBookingStore> {
    seed(pool).await;
    BookingService::new(PgBookingStore::new(pool.clone(), 5_000))
}

fn request(seat_ids: &[i64]) -> BookingRequest {
    BookingRequest {
        schedule_id: 1,
        seat_ids: seat_ids.to_vec(),
        user_id: 1,
        payment_id: 1,
        fullname: "Budi Santoso".into(),
        email: "budi@example.com".into(),
        phone: "081234567890".into(),
        idempotency_key: None,
    }
}

fn keyed(seat_ids: &[i64], key: &str) -> BookingRequest {
    BookingRequest {
        idempotency_key: Some(key.to_string()),
        ..request(seat_ids)
    }
}

fn desk_order() -> NewOrder {
    NewOrder {
        schedule_id: 1,
        user_id: 2,
        payment_id: 1,
        total: UNIT_PRICE,
        fullname: "Box Office".into(),
        email: "desk@example.com".into(),
        phone: "0000000".into(),
        idempotency_key: None,
    }
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "src/migrations")]
async fn three_seats_at_fifty_thousand(pool: PgPool) {
    let service = service(&pool).await;

    let booked = service.book(request(&[1, 2, 3])).await.unwrap();

    assert_eq!(booked.order.total, 150_000);
    assert!(!booked.order.paid);
    for seat in [1, 2, 3] {
        assert!(!service.check_available(seat).await.unwrap());
    }
    assert_eq!(count(&pool, "order_seat").await, 3);
}

#[sqlx::test(migrations = "src/migrations")]
async fn overlapping_repeat_fails_without_side_effects(pool: PgPool) {
    let service = service(&pool).await;
    service.book(request(&[1, 2, 3])).await.unwrap();

    let err = service.book(request(&[2, 3, 4])).await.unwrap_err();

    assert_eq!(err, BookingError::SeatUnavailable { seat_id: 2 });
    assert_eq!(count(&pool, "orders").await, 1);
    assert_eq!(count(&pool, "order_seat").await, 3);
    assert!(service.check_available(4).await.unwrap());
}

#[sqlx::test(migrations = "src/migrations")]
async fn contended_seat_is_claimed_exactly_once(pool: PgPool) {
    let service = service(&pool).await;

    let attempts = (0..6).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.book(request(&[10])).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == BookingError::SeatUnavailable { seat_id: 10 }));
    assert_eq!(count(&pool, "orders").await, 1);
    assert_eq!(count(&pool, "order_seat").await, 1);
}

#[sqlx::test(migrations = "src/migrations")]
async fn reversed_seat_orders_do_not_deadlock(pool: PgPool) {
    let service = service(&pool).await;

    let a = {
        let service = service.clone();
        tokio::spawn(async move { service.book(request(&[3, 7])).await })
    };
    let b = {
        let service = service.clone();
        tokio::spawn(async move { service.book(request(&[7, 3])).await })
    };

    let outcomes = tokio::time::timeout(Duration::from_secs(10), async {
        [a.await.unwrap(), b.await.unwrap()]
    })
    .await
    .expect("both bookings must terminate");

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(loser, BookingError::SeatUnavailable { seat_id: 3 | 7 }));
    assert_eq!(count(&pool, "order_seat").await, 2);
}

#[sqlx::test(migrations = "src/migrations")]
async fn waiter_sees_seat_taken_after_holder_commits(pool: PgPool) {
    let service = service(&pool).await;
    let store = PgBookingStore::new(pool.clone(), 5_000);

    let mut holder = store.begin().await.unwrap();
    let order = holder.insert_order(&desk_order()).await.unwrap().unwrap();
    assert!(holder.lock_seat(20).await.unwrap());

    let waiter = {
        let service = service.clone();
        tokio::spawn(async move { service.book(request(&[20])).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished(), "waiter must block on FOR UPDATE");

    holder.link_seat(order.id, 20).await.unwrap();
    holder.mark_unavailable(20).await.unwrap();
    holder.commit().await.unwrap();

    assert_eq!(
        waiter.await.unwrap().unwrap_err(),
        BookingError::SeatUnavailable { seat_id: 20 }
    );
    assert_eq!(count(&pool, "orders").await, 1);
}

#[sqlx::test(migrations = "src/migrations")]
async fn lock_wait_past_timeout_is_transient(pool: PgPool) {
    seed(&pool).await;
    let patient = PgBookingStore::new(pool.clone(), 5_000);
    let impatient = BookingService::new(PgBookingStore::new(pool.clone(), 200));

    let mut holder = patient.begin().await.unwrap();
    assert!(holder.lock_seat(21).await.unwrap());

    let err = impatient.book(request(&[21])).await.unwrap_err();
    assert!(matches!(err, BookingError::TransientStoreFailure(_)), "{err:?}");
    assert!(err.is_retryable());
    assert_eq!(count(&pool, "orders").await, 0);

    holder.rollback().await.unwrap();
    impatient.book(request(&[21])).await.unwrap();
}

#[sqlx::test(migrations = "src/migrations")]
async fn retry_with_same_key_replays_the_first_order(pool: PgPool) {
    let service = service(&pool).await;

    let first = service.book(keyed(&[30, 31], "checkout-1")).await.unwrap();
    let retry = service.book(keyed(&[31, 30], "checkout-1")).await.unwrap();

    assert!(!first.replayed);
    assert!(retry.replayed);
    assert_eq!(retry.order, first.order);
    assert_eq!(retry.seat_ids, vec![30, 31]);
    assert_eq!(count(&pool, "orders").await, 1);
}

#[sqlx::test(migrations = "src/migrations")]
async fn reused_key_for_other_seats_is_rejected(pool: PgPool) {
    let service = service(&pool).await;

    service.book(keyed(&[1], "k")).await.unwrap();
    let err = service.book(keyed(&[5, 6, 7], "k")).await.unwrap_err();

    assert!(matches!(err, BookingError::InvalidArgument(_)));
    assert_eq!(count(&pool, "orders").await, 1);
    for seat in [5, 6, 7] {
        assert!(service.check_available(seat).await.unwrap());
    }
}

#[sqlx::test(migrations = "src/migrations")]
async fn concurrent_retries_with_one_key_create_one_order(pool: PgPool) {
    let service = service(&pool).await;

    let attempts = (0..4).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.book(keyed(&[33], "double-click")).await })
    });
    let booked: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(booked.iter().filter(|b| !b.replayed).count(), 1);
    assert!(booked.iter().all(|b| b.order.id == booked[0].order.id));
    assert_eq!(count(&pool, "orders").await, 1);
}

#[sqlx::test(migrations = "src/migrations")]
async fn missing_references_are_classified(pool: PgPool) {
    let service = service(&pool).await;

    let unknown_payment = BookingRequest {
        payment_id: 999,
        ..request(&[1])
    };
    assert!(matches!(
        service.book(unknown_payment).await,
        Err(BookingError::ConstraintViolation(_))
    ));

    let unknown_schedule = BookingRequest {
        schedule_id: 99,
        ..request(&[1])
    };
    assert_eq!(
        service.book(unknown_schedule).await.unwrap_err(),
        BookingError::NotFound { entity: "schedule", id: 99 }
    );

    assert_eq!(
        service.book(request(&[1, 999])).await.unwrap_err(),
        BookingError::NotFound { entity: "seat", id: 999 }
    );
    assert_eq!(count(&pool, "orders").await, 0);
    assert!(service.check_available(1).await.unwrap());
}

#[sqlx::test(migrations = "src/migrations")]
async fn linking_a_sold_seat_is_a_conflict(pool: PgPool) {
    let service = service(&pool).await;
    service.book(request(&[35])).await.unwrap();

    let store = PgBookingStore::new(pool.clone(), 5_000);
    let mut tx = store.begin().await.unwrap();
    let order = tx.insert_order(&desk_order()).await.unwrap().unwrap();

    assert_eq!(
        tx.link_seat(order.id, 35).await.unwrap_err(),
        BookingError::Conflict("uq_order_seat_seat".into())
    );
    tx.rollback().await.unwrap();
    assert_eq!(count(&pool, "orders").await, 1);
}
