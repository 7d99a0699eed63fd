pub mod manager;

pub use bejaia_shared::{Reservation, ReservationStatus};
pub use manager::ReservationManager;
