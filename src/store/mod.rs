//! Persistence boundary. Handlers and services only see [`Store`]; the
//! server picks [`PgStore`] when a database is configured and
//! [`MemoryStore`] otherwise.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    MassageShop, NewReservation, NewShop, NewUser, Reservation, ReservationFilter, ScheduleWrite,
    ShopChanges, ShopFilter, ShopQuery, User,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn list_shops(&self, query: &ShopQuery) -> Result<Vec<MassageShop>, AppError>;
    async fn count_shops(&self, filter: &ShopFilter) -> Result<i64, AppError>;
    async fn get_shop(&self, id: i64) -> Result<Option<MassageShop>, AppError>;
    async fn create_shop(&self, shop: NewShop) -> Result<MassageShop, AppError>;
    async fn update_shop(&self, id: i64, changes: ShopChanges) -> Result<Option<MassageShop>, AppError>;
    /// Removes the shop together with its reservations.
    async fn delete_shop(&self, id: i64) -> Result<bool, AppError>;

    async fn get_reservation(&self, id: i64) -> Result<Option<Reservation>, AppError>;
    async fn list_reservations(&self, filter: ReservationFilter) -> Result<Vec<Reservation>, AppError>;
    async fn count_reservations(&self, filter: ReservationFilter) -> Result<i64, AppError>;

    // The three writes below apply `writes` and the reservation change
    // atomically: either everything is stored or nothing is.
    async fn create_reservation(
        &self,
        writes: Vec<ScheduleWrite>,
        reservation: NewReservation,
    ) -> Result<Reservation, AppError>;
    async fn update_reservation(
        &self,
        writes: Vec<ScheduleWrite>,
        reservation: Reservation,
    ) -> Result<Reservation, AppError>;
    async fn delete_reservation(&self, writes: Vec<ScheduleWrite>, id: i64) -> Result<bool, AppError>;
}
