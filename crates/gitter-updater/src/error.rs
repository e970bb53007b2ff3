//! Error types for the update system.

use thiserror::Error;

/// Errors that can occur during update operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Manifest request completed with a non-success HTTP status
    #[error("manifest request failed with status {status}")]
    ManifestRequestFailed { status: u16 },

    /// Download failed with HTTP status
    #[error("download failed with status {status}")]
    DownloadFailed { status: u16 },

    /// Network error during a manifest fetch or download
    #[error("network error: {0}")]
    NetworkError(String),

    /// Manifest carries no package for the current platform
    #[error("no package available for platform {0}")]
    NoPackageForPlatform(String),

    /// Downloaded package size does not match the manifest
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Downloaded package digest does not match the manifest
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Package archive format is not recognised
    #[error("unsupported package format: {0}")]
    UnsupportedPackageFormat(String),

    /// Unpacking the downloaded package failed
    #[error("unpack failed: {0}")]
    UnpackFailed(String),

    /// Installation failed
    #[error("installation failed: {0}")]
    InstallationFailed(String),

    /// Showing a user notification failed
    #[error("notification failed: {0}")]
    NotificationFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Version parsing error
    #[error("version parse error: {0}")]
    VersionParseError(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        UpdateError::HttpError(err.to_string())
    }
}

impl From<semver::Error> for UpdateError {
    fn from(err: semver::Error) -> Self {
        UpdateError::VersionParseError(err.to_string())
    }
}

impl From<zip::result::ZipError> for UpdateError {
    fn from(err: zip::result::ZipError) -> Self {
        UpdateError::UnpackFailed(err.to_string())
    }
}
