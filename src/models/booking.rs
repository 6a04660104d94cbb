use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// A booking reserves one venue for one event on one calendar day. The
// booking_date keeps its time-of-day in storage, but conflicts are decided
// at day granularity only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub event_id: i64,
    pub venue_id: i64,
    pub booking_date: NaiveDateTime,
}
