use futures_util::future::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BiometricError {
    #[error("Biometric hardware is not available")]
    HardwareUnavailable,

    #[error("Authentication cancelled")]
    UserCancelled,

    #[error("No biometric credential is enrolled on this device")]
    NoneEnrolled,

    #[error("Biometric authentication failed: {0}")]
    Failed(String),
}

impl BiometricError {
    /// Only a rejected credential counts towards the attempt limit.
    pub fn counts_as_attempt(&self) -> bool {
        matches!(self, BiometricError::Failed(_))
    }
}

/// Platform strong-authentication prompt (fingerprint, face, device
/// credential).
pub trait BiometricAuthenticator: Send + Sync {
    fn authenticate(&self) -> BoxFuture<'_, Result<(), BiometricError>>;
}
