use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::MassageShop;
use crate::scheduling::{ShopSchedule, TimeOfDay};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopRequest {
    pub name: String,
    pub address: String,
    pub district: String,
    pub province: String,
    pub postalcode: String,
    pub tel: Option<String>,
    pub open_time: String,
    pub close_time: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub postalcode: Option<String>,
    pub tel: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    // Only present so its presence can be rejected.
    pub busy_time: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
pub struct ShopListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopResponse {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub district: String,
    pub province: String,
    pub postalcode: String,
    pub tel: Option<String>,
    pub open_time: TimeOfDay,
    pub close_time: TimeOfDay,
    pub busy_time: ShopSchedule,
    pub created_at: DateTime<Utc>,
}

impl From<MassageShop> for ShopResponse {
    fn from(shop: MassageShop) -> Self {
        Self {
            id: shop.id,
            name: shop.name,
            address: shop.address,
            district: shop.district,
            province: shop.province,
            postalcode: shop.postalcode,
            tel: shop.tel,
            open_time: shop.open_time,
            close_time: shop.close_time,
            busy_time: shop.busy_time,
            created_at: shop.created_at,
        }
    }
}

#[derive(Serialize, Clone)]
pub struct ShopSummary {
    pub id: i64,
    pub name: String,
    pub province: String,
    pub tel: Option<String>,
}

impl From<&MassageShop> for ShopSummary {
    fn from(shop: &MassageShop) -> Self {
        Self {
            id: shop.id,
            name: shop.name.clone(),
            province: shop.province.clone(),
            tel: shop.tel.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize, Default, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let start_index = (page - 1).saturating_mul(limit);
        let end_index = page.saturating_mul(limit);
        Self {
            next: (end_index < total).then(|| PageRef { page: page + 1, limit }),
            prev: (start_index > 0).then(|| PageRef { page: page - 1, limit }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_links() {
        assert_eq!(Pagination::new(1, 25, 10), Pagination::default());
        assert_eq!(
            Pagination::new(1, 2, 5),
            Pagination { next: Some(PageRef { page: 2, limit: 2 }), prev: None }
        );
        assert_eq!(
            Pagination::new(3, 2, 5),
            Pagination { next: None, prev: Some(PageRef { page: 2, limit: 2 }) }
        );
    }

    #[test]
    fn pagination_saturates_on_huge_pages() {
        assert_eq!(
            Pagination::new(i64::MAX, 100, 5),
            Pagination { next: None, prev: Some(PageRef { page: i64::MAX - 1, limit: 100 }) }
        );
    }
}
