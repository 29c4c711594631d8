use crate::backend::{BackendId, Capability};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Backend errors
    #[error("Backend {backend} does not support {capability}")]
    Unsupported {
        backend: BackendId,
        capability: Capability,
    },

    #[error("Backend {backend} failed: {reason}")]
    BackendFailed { backend: BackendId, reason: String },

    #[error("Track not found: {title} by {artist}")]
    TrackNotFound { title: String, artist: String },

    // Playback URL resolution errors. The messages are shown to users as-is.
    #[error("Login session is invalid, please sign in again and retry")]
    NotAuthenticated { track_id: String },

    #[error("This track requires a paid purchase or a membership")]
    PaidContent { track_id: String },

    #[error("This track is currently unavailable, possibly due to licensing or membership restrictions")]
    TrackUnavailable { track_id: String },

    // Network errors
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error came out of quality-tier exhaustion.
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated { .. } | Self::PaidContent { .. } | Self::TrackUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
