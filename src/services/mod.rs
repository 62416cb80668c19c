pub mod booking;
pub mod memory_store;
pub mod pg_store;
pub mod store;

pub use booking::{BookingPhase, BookingRequest, BookingService};
pub use memory_store::MemoryBookingStore;
pub use pg_store::PgBookingStore;
pub use store::{BookingStore, BookingTx};
