use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Store;
use crate::error::AppError;
use crate::models::{
    MassageShop, NewReservation, NewShop, NewUser, Reservation, ReservationFilter, ScheduleWrite,
    ShopChanges, ShopFilter, ShopQuery, ShopSort, User,
};
use crate::scheduling::ShopSchedule;

/// Process-local store. Every write takes the single lock, so schedule and
/// reservation changes land together.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    shops: BTreeMap<i64, MassageShop>,
    reservations: BTreeMap<i64, Reservation>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn apply_writes(&mut self, writes: Vec<ScheduleWrite>) -> Result<(), AppError> {
        if let Some(missing) = writes.iter().find(|w| !self.shops.contains_key(&w.shop_id)) {
            return Err(AppError::not_found(format!(
                "No massage shop with the id of {}",
                missing.shop_id
            )));
        }
        for write in writes {
            if let Some(shop) = self.shops.get_mut(&write.shop_id) {
                shop.busy_time.set_day(write.date, write.day);
            }
        }
        Ok(())
    }
}

fn matches_filter(shop: &MassageShop, filter: &ShopFilter) -> bool {
    filter.province.as_deref().is_none_or(|p| shop.province == p)
        && filter.district.as_deref().is_none_or(|d| shop.district == d)
}

fn matches_reservation(resv: &Reservation, filter: ReservationFilter) -> bool {
    filter.user_id.is_none_or(|id| resv.user_id == id)
        && filter.shop_id.is_none_or(|id| resv.shop_id == id)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict("Email already registered"));
        }
        let id = inner.next_id();
        let user = User {
            id,
            name: user.name,
            telephone: user.telephone,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn list_shops(&self, query: &ShopQuery) -> Result<Vec<MassageShop>, AppError> {
        let inner = self.inner.read().await;
        let mut shops: Vec<MassageShop> = inner
            .shops
            .values()
            .filter(|s| matches_filter(s, &query.filter))
            .cloned()
            .collect();

        // Ids are assigned in creation order, so they break ties the same way
        // the database does.
        match query.sort {
            ShopSort::Name => shops.sort_by(|a, b| a.name.cmp(&b.name)),
            ShopSort::NameDesc => shops.sort_by(|a, b| b.name.cmp(&a.name)),
            ShopSort::CreatedAt => shops.sort_by_key(|s| (s.created_at, s.id)),
            ShopSort::CreatedAtDesc => {
                shops.sort_by_key(|s| std::cmp::Reverse((s.created_at, s.id)))
            }
        }

        Ok(shops
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn count_shops(&self, filter: &ShopFilter) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.shops.values().filter(|s| matches_filter(s, filter)).count() as i64)
    }

    async fn get_shop(&self, id: i64) -> Result<Option<MassageShop>, AppError> {
        Ok(self.inner.read().await.shops.get(&id).cloned())
    }

    async fn create_shop(&self, shop: NewShop) -> Result<MassageShop, AppError> {
        let mut inner = self.inner.write().await;
        if inner.shops.values().any(|s| s.name == shop.name) {
            return Err(AppError::conflict("Massage shop name already exists"));
        }
        let id = inner.next_id();
        let shop = MassageShop {
            id,
            name: shop.name,
            address: shop.address,
            district: shop.district,
            province: shop.province,
            postalcode: shop.postalcode,
            tel: shop.tel,
            open_time: shop.open_time,
            close_time: shop.close_time,
            busy_time: ShopSchedule::new(),
            created_at: Utc::now(),
        };
        inner.shops.insert(id, shop.clone());
        Ok(shop)
    }

    async fn update_shop(&self, id: i64, changes: ShopChanges) -> Result<Option<MassageShop>, AppError> {
        let mut inner = self.inner.write().await;
        if let Some(name) = &changes.name {
            if inner.shops.values().any(|s| s.id != id && &s.name == name) {
                return Err(AppError::conflict("Massage shop name already exists"));
            }
        }
        let Some(shop) = inner.shops.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            shop.name = name;
        }
        if let Some(address) = changes.address {
            shop.address = address;
        }
        if let Some(district) = changes.district {
            shop.district = district;
        }
        if let Some(province) = changes.province {
            shop.province = province;
        }
        if let Some(postalcode) = changes.postalcode {
            shop.postalcode = postalcode;
        }
        if let Some(tel) = changes.tel {
            shop.tel = Some(tel);
        }
        if let Some(open_time) = changes.open_time {
            shop.open_time = open_time;
        }
        if let Some(close_time) = changes.close_time {
            shop.close_time = close_time;
        }
        Ok(Some(shop.clone()))
    }

    async fn delete_shop(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        if inner.shops.remove(&id).is_none() {
            return Ok(false);
        }
        inner.reservations.retain(|_, r| r.shop_id != id);
        Ok(true)
    }

    async fn get_reservation(&self, id: i64) -> Result<Option<Reservation>, AppError> {
        Ok(self.inner.read().await.reservations.get(&id).cloned())
    }

    async fn list_reservations(&self, filter: ReservationFilter) -> Result<Vec<Reservation>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reservations
            .values()
            .filter(|r| matches_reservation(r, filter))
            .cloned()
            .collect())
    }

    async fn count_reservations(&self, filter: ReservationFilter) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reservations
            .values()
            .filter(|r| matches_reservation(r, filter))
            .count() as i64)
    }

    async fn create_reservation(
        &self,
        writes: Vec<ScheduleWrite>,
        reservation: NewReservation,
    ) -> Result<Reservation, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&reservation.user_id) {
            return Err(AppError::not_found(format!(
                "No user with the id of {}",
                reservation.user_id
            )));
        }
        inner.apply_writes(writes)?;

        let id = inner.next_id();
        let reservation = Reservation {
            id,
            user_id: reservation.user_id,
            shop_id: reservation.shop_id,
            resv_date: reservation.resv_date,
            range: reservation.range,
            created_at: Utc::now(),
        };
        inner.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn update_reservation(
        &self,
        writes: Vec<ScheduleWrite>,
        reservation: Reservation,
    ) -> Result<Reservation, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.reservations.contains_key(&reservation.id) {
            return Err(AppError::not_found(format!(
                "No reservation with the id of {}",
                reservation.id
            )));
        }
        inner.apply_writes(writes)?;
        inner.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn delete_reservation(&self, writes: Vec<ScheduleWrite>, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.reservations.contains_key(&id) {
            return Ok(false);
        }
        inner.apply_writes(writes)?;
        inner.reservations.remove(&id);
        Ok(true)
    }
}
