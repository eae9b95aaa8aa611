use thiserror::Error;

/// Errors surfaced by the volume control core.
///
/// Native result codes never appear here: the registry translates them into
/// `DeviceUnavailable`, `AccessDenied` or `Timeout` at its boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("refresh failed: {0}")]
    RefreshFailed(String),

    #[error("action name already registered: {0}")]
    DuplicateActionName(String),

    #[error("action '{name}' failed: {reason}")]
    ActionFailed { name: String, reason: String },

    #[error("volume control API already initialized")]
    AlreadyInitialized,

    #[error("volume control API not initialized")]
    NotInitialized,

    #[error("native call timed out: {0}")]
    Timeout(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ControlError {
    /// Whether this condition is expected at runtime and should only be logged.
    ///
    /// Misconfiguration (`AlreadyInitialized`, `DuplicateActionName`,
    /// `InvalidConfiguration`) is not recoverable and must reach the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::AlreadyInitialized | Self::DuplicateActionName(_) | Self::InvalidConfiguration(_)
        )
    }
}
