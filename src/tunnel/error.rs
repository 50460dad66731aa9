//! Error types for the tunnel module.

use thiserror::Error;

use crate::config::ConfigError;
use crate::tunnel::types::TunnelId;

/// Result type for tunnel operations.
pub type TunnelResult<T> = Result<T, TunnelError>;

/// Errors that can occur while driving a tunnel's lifecycle.
///
/// Every Start-path variant is returned only after resources allocated by
/// earlier steps have been released; no error leaks a live handle.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Configuration file was unreadable or malformed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The `[Interface]` section carries no `Address` entry
    #[error("[Interface] section has no Address entry")]
    MissingAddress,

    /// Platform driver dependency could not be located
    #[error("platform driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Virtual interface creation failed
    #[error("failed to create virtual interface: {0}")]
    InterfaceCreateFailed(String),

    /// The engine rejected the control document or its channel failed
    #[error("failed to configure tunnel engine: {0}")]
    EngineConfigureFailed(String),

    /// The engine could not be brought up
    #[error("failed to activate tunnel engine: {0}")]
    EngineActivateFailed(String),

    /// Host addressing could not be applied to the new interface
    #[error("failed to apply host addressing: {0}")]
    AddressingFailed(String),

    /// A tunnel for this identity is already registered
    #[error("tunnel already active for {0}")]
    AlreadyActive(TunnelId),

    /// A collaborator call exceeded its time bound
    #[error("operation timed out: {0}")]
    Timeout(String),
}
