pub mod attempt;
pub mod availability;
pub mod events;
pub mod reservation;
pub mod verification;

pub use attempt::AttemptLogEntry;
pub use availability::{BlockedDate, DEFAULT_BLOCK_REASON};
pub use reservation::{Reservation, ReservationDraft, ReservationKind, ReservationStatus};
pub use verification::VerificationToken;
