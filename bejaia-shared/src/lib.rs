pub mod models;
pub mod pii;

pub use models::{
    AttemptLogEntry, BlockedDate, ReservationDraft, Reservation, ReservationKind,
    ReservationStatus, VerificationToken,
};
