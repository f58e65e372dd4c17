pub mod biometric;
pub mod password;
pub mod rate_limit;
pub mod session;

pub use biometric::{BiometricAuthenticator, BiometricError};
pub use rate_limit::AttemptLimiter;
pub use session::{can_access, start_route, Route, SessionGate, SessionState};
