use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinError {
    #[error("Please enter a Pinterest URL")]
    EmptyInput,
    /// Carries the rejected input for logging; the message only shows the accepted formats.
    #[error(
        "Please enter a valid Pinterest pin URL (e.g., pinterest.com/pin/123... or pin.it/abc...)"
    )]
    InvalidUrl(String),
    #[error("{0}")]
    InspectionFailed(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("download failed: {0}")]
    Download(String),
}

pub type PinResult<T> = Result<T, PinError>;
