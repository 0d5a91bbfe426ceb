use chrono::{DateTime, NaiveDate, Utc};

use crate::scheduling::{DayBook, TimeRange};

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub shop_id: i64,
    pub resv_date: NaiveDate,
    pub range: TimeRange,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: i64,
    pub shop_id: i64,
    pub resv_date: NaiveDate,
    pub range: TimeRange,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReservationFilter {
    pub user_id: Option<i64>,
    pub shop_id: Option<i64>,
}

/// Replacement DayBook for one shop and date, written together with the
/// reservation row it belongs to.
#[derive(Debug, Clone)]
pub struct ScheduleWrite {
    pub shop_id: i64,
    pub date: NaiveDate,
    pub day: DayBook,
}
