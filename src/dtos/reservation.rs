use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

use crate::dtos::shop::ShopSummary;
use crate::models::Reservation;
use crate::scheduling::TimeOfDay;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub resv_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    pub massage_shop: Option<i64>,
    pub resv_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: i64,
    pub user: i64,
    pub massage_shop: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop: Option<ShopSummary>,
    pub resv_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub created_at: DateTime<Utc>,
}

impl ReservationResponse {
    pub fn new(resv: Reservation, shop: Option<ShopSummary>) -> Self {
        Self {
            id: resv.id,
            user: resv.user_id,
            massage_shop: resv.shop_id,
            shop,
            resv_date: resv.resv_date,
            start_time: resv.range.start,
            end_time: resv.range.end,
            created_at: resv.created_at,
        }
    }
}

impl From<Reservation> for ReservationResponse {
    fn from(resv: Reservation) -> Self {
        Self::new(resv, None)
    }
}
