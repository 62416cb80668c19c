pub mod history;
pub mod movie;
pub mod order;
pub mod payment;
pub mod profile;
pub mod schedule;
pub mod seat;
pub mod user;

pub use history::HistoryEntry;
pub use movie::{Genre, MovieDetail, MovieFilter, MovieSummary};
pub use order::{BookedOrder, NewOrder, Order};
pub use payment::PaymentMethod;
pub use profile::{Profile, ProfileUpdate};
pub use schedule::ScheduleListing;
pub use seat::Seat;
pub use user::{Role, User};

use serde::Deserialize;

/// `?page=N` pagination; pages are 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn limit_offset(&self, page_size: u32) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let offset = (page - 1) as i64 * page_size as i64;
        (page_size as i64, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_zero_offset() {
        assert_eq!(PageQuery { page: None }.limit_offset(5), (5, 0));
        assert_eq!(PageQuery { page: Some(0) }.limit_offset(5), (5, 0));
        assert_eq!(PageQuery { page: Some(3) }.limit_offset(10), (10, 20));
    }
}
