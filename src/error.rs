//! Error types for envsync operations

use thiserror::Error;

/// The main error type for envsync operations
///
/// Covers both the protocol-level failure taxonomy (authentication,
/// conflicts, missing resources) and the local plumbing errors that can
/// occur while reading or writing context files and the working file.
#[derive(Error, Debug)]
pub enum EnvSyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error(
        "Not logged in.\n\nTo fix this, either:\n  1. Run 'envsync login' to store a personal access token\n  2. Set ENVSYNC_TOKEN to a service token"
    )]
    AuthenticationRequired,
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Version conflict: the remote environment is at version {remote_version}, but this push was based on {}",
        base.map(|v| v.to_string()).unwrap_or_else(|| "no version".to_string()))]
    Conflict {
        base: Option<u64>,
        remote_version: u64,
    },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Cancelled")]
    Cancelled,
    #[error("Interactive input required for {0}, but prompts are disabled in this mode")]
    InteractiveRequired(String),
}

/// A type alias for `Result<T, EnvSyncError>`
pub type Result<T> = std::result::Result<T, EnvSyncError>;

impl EnvSyncError {
    /// Stable machine-readable name for the `--json` error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            EnvSyncError::Io(_) => "io",
            EnvSyncError::Toml(_) | EnvSyncError::TomlSer(_) => "toml",
            EnvSyncError::Json(_) => "json",
            EnvSyncError::Keyring(_) => "keyring",
            EnvSyncError::AuthenticationRequired => "authentication_required",
            EnvSyncError::PermissionDenied(_) => "permission_denied",
            EnvSyncError::NotFound(_) => "not_found",
            EnvSyncError::Conflict { .. } => "conflict",
            EnvSyncError::Validation(_) => "validation",
            EnvSyncError::Configuration(_) => "configuration",
            EnvSyncError::Network(_) => "network",
            EnvSyncError::Cancelled => "cancelled",
            EnvSyncError::InteractiveRequired(_) => "interactive_required",
        }
    }

    /// Process exit code for this error. One table, used once per
    /// invocation at the dispatch boundary in `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            EnvSyncError::Validation(_) => 2,
            EnvSyncError::Configuration(_) | EnvSyncError::Toml(_) | EnvSyncError::TomlSer(_) => 3,
            EnvSyncError::AuthenticationRequired => 4,
            EnvSyncError::PermissionDenied(_) => 5,
            EnvSyncError::NotFound(_) => 6,
            EnvSyncError::Conflict { .. } => 7,
            EnvSyncError::Network(_) => 8,
            EnvSyncError::Cancelled | EnvSyncError::InteractiveRequired(_) => 130,
            _ => 1,
        }
    }
}

impl From<inquire::InquireError> for EnvSyncError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => EnvSyncError::Cancelled,
            other => EnvSyncError::Validation(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for EnvSyncError {
    fn from(err: reqwest::Error) -> Self {
        EnvSyncError::Network(err.to_string())
    }
}
