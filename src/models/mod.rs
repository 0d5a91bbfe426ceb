pub mod reservation;
pub mod shop;
pub mod user;

pub use reservation::{NewReservation, Reservation, ReservationFilter, ScheduleWrite};
pub use shop::{MassageShop, NewShop, ShopChanges, ShopFilter, ShopQuery, ShopSort};
pub use user::{NewUser, Role, User};
