pub mod abuse;
pub mod blocked;
pub mod locks;
pub mod pipeline;
pub mod sanitizer;
pub mod tokens;
pub mod validator;

pub use abuse::{AbuseDetector, AbuseReport, AnomalyTag};
pub use blocked::BlockedDateGuard;
pub use pipeline::{AdmissionDecision, AdmissionPipeline};
pub use sanitizer::{sanitize, RawReservation};
pub use tokens::VerificationTokenStore;
