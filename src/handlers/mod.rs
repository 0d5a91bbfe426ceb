pub mod reservation;
pub mod shop;
pub mod user;
