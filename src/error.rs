use thiserror::Error;

/// Rejected configuration, raised before any timer is armed.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}
