pub mod locks;
pub mod reservations;

pub use locks::KeyedLocks;
pub use reservations::ReservationService;
