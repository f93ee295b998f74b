use thiserror::Error;

/// Error taxonomy for the programming core.
///
/// `Config` is surfaced synchronously to the caller (bad request territory),
/// `Dependency` covers unreachable collaborators and may be retried,
/// `Data` must never abort a scoring run (criteria degrade to neutral),
/// `Internal` fails the owning job with a diagnostic.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("dependency unavailable: {0}")]
    Dependency(String),

    #[error("invalid content data: {0}")]
    Data(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
