//! Error types for Playhead Core

use crate::types::PlaybackBackend;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Session error types
#[derive(Error, Debug)]
pub enum Error {
    // Session API misuse
    #[error("Session has not been configured")]
    NotConfigured,

    #[error("Session has not been initialized")]
    SessionNotInitialized,

    #[error("Ad URL count mismatch: {ads} ad URLs for {videos} videos")]
    AdCountMismatch { videos: usize, ads: usize },

    #[error("Playlist is empty")]
    EmptyPlaylist,

    #[error("Playback backend not available: {0}")]
    BackendUnavailable(PlaybackBackend),

    // Playback errors
    #[error("Recoverable stream discontinuity: {0}")]
    RecoverableStreamDiscontinuity(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Playback engine error: {0}")]
    EngineFatal(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Session task has shut down")]
    SessionClosed,
}

impl Error {
    /// Returns true if playback can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RecoverableStreamDiscontinuity(_))
    }

    /// Returns the stable error code reported to listeners
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotConfigured => "NOT_CONFIGURED",
            Error::SessionNotInitialized => "SESSION_NOT_INITIALIZED",
            Error::AdCountMismatch { .. } => "AD_COUNT_MISMATCH",
            Error::EmptyPlaylist => "EMPTY_PLAYLIST",
            Error::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Error::RecoverableStreamDiscontinuity(_) => "STREAM_DISCONTINUITY",
            Error::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            Error::EngineFatal(_) => "ENGINE_FATAL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Config(_) => "CONFIG_PARSE",
            Error::Io(_) => "IO",
            Error::SessionClosed => "SESSION_CLOSED",
        }
    }
}

/// Classification of a playback failure reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Live position fell outside the available window; recovered by reseeking
    BehindLiveWindow,
    /// Network or IO failure while resolving the source
    SourceUnavailable,
    /// Anything the engine could not classify
    EngineFatal,
}

impl ErrorKind {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::BehindLiveWindow)
    }

    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BehindLiveWindow => "BEHIND_LIVE_WINDOW",
            ErrorKind::SourceUnavailable => "SOURCE_UNAVAILABLE",
            ErrorKind::EngineFatal => "ENGINE_FATAL",
        }
    }
}

/// A classified playback failure as surfaced to the error listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PlaybackError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl From<PlaybackError> for Error {
    fn from(err: PlaybackError) -> Self {
        match err.kind {
            ErrorKind::BehindLiveWindow => Error::RecoverableStreamDiscontinuity(err.message),
            ErrorKind::SourceUnavailable => Error::SourceUnavailable(err.message),
            ErrorKind::EngineFatal => Error::EngineFatal(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_error_into_error() {
        let err: Error = PlaybackError::new(ErrorKind::SourceUnavailable, "404").into();
        assert_eq!(err.error_code(), "SOURCE_UNAVAILABLE");

        let err: Error = PlaybackError::new(ErrorKind::BehindLiveWindow, "late").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_only_discontinuity_is_recoverable() {
        assert!(Error::RecoverableStreamDiscontinuity("behind live window".into()).is_recoverable());
        assert!(!Error::SourceUnavailable("dns".into()).is_recoverable());
        assert!(!Error::EngineFatal("decoder".into()).is_recoverable());
        assert!(!Error::NotConfigured.is_recoverable());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::NotConfigured.error_code(), "NOT_CONFIGURED");
        assert_eq!(
            Error::AdCountMismatch { videos: 3, ads: 1 }.error_code(),
            "AD_COUNT_MISMATCH"
        );
        assert_eq!(
            Error::BackendUnavailable(PlaybackBackend::Cast).to_string(),
            "Playback backend not available: cast"
        );
    }
}
