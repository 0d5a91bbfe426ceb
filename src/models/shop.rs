use chrono::{DateTime, Utc};

use crate::scheduling::{ShopSchedule, TimeOfDay};

#[derive(Debug, Clone)]
pub struct MassageShop {
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

#[derive(Debug, Clone)]
pub struct NewShop {
    pub name: String,
    pub address: String,
    pub district: String,
    pub province: String,
    pub postalcode: String,
    pub tel: Option<String>,
    pub open_time: TimeOfDay,
    pub close_time: TimeOfDay,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ShopChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub postalcode: Option<String>,
    pub tel: Option<String>,
    pub open_time: Option<TimeOfDay>,
    pub close_time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShopSort {
    Name,
    NameDesc,
    CreatedAt,
    #[default]
    CreatedAtDesc,
}

impl ShopSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(ShopSort::Name),
            "-name" => Some(ShopSort::NameDesc),
            "createdAt" => Some(ShopSort::CreatedAt),
            "-createdAt" => Some(ShopSort::CreatedAtDesc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShopFilter {
    pub province: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShopQuery {
    pub filter: ShopFilter,
    pub sort: ShopSort,
    pub offset: i64,
    pub limit: i64,
}
