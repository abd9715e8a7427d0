//! Error types for the coderelay bot.

use thiserror::Error;

use coderelay_backends::{CliBackend, UnknownBackend};

/// Errors surfaced to users as short chat messages.
///
/// None of these are fatal to the process: a failing chat never takes
/// down another chat or workspace. Transport delivery failures are the
/// exception and stay `teloxide::RequestError`, propagated through
/// handler return values because the channel itself may be unusable.
#[derive(Debug, Error)]
pub enum RelayError {
    /// User requested a CLI outside the supported or allowed set.
    #[error("unsupported CLI: {0}. Use: {}", CliBackend::supported_list())]
    UnsupportedBackend(String),

    /// Image resolution or transfer failed; the message attempt is aborted.
    #[error("failed to download image: {0}")]
    Download(String),

    /// The chat has never interacted, so there is nothing to report.
    #[error("no activity recorded for this chat yet")]
    NoSession,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for coderelay bot operations.
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<UnknownBackend> for RelayError {
    fn from(e: UnknownBackend) -> Self {
        RelayError::UnsupportedBackend(e.0)
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Download(e.to_string())
    }
}
