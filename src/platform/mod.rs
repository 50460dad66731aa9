//! External collaborator boundary: driver probe, virtual interface, tunnel
//! engine, and host addressing.
//!
//! The lifecycle manager only ever sees these traits. Production
//! implementations live in the submodules; tests substitute their own.

pub mod driver;
#[cfg(unix)]
pub mod engine;
pub mod host;

pub use driver::DriverProbe;
pub use host::CommandAddressing;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;
use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors from the platform collaborators.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No driver library found at any of the probed locations
    #[error("driver library not found ({searched} locations probed)")]
    DriverNotFound { searched: usize },

    /// A host network-configuration command failed
    #[error("system command failed: {0}")]
    Command(String),

    /// A collaborator call exceeded its time bound
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Virtual interface error
    #[error("virtual interface error: {0}")]
    Interface(String),

    /// Tunnel engine error
    #[error("tunnel engine error: {0}")]
    Engine(String),
}

/// Handle to a created virtual network interface.
///
/// The handle is exclusively owned: by the Start sequence until registration,
/// then by the registry until Stop. `close` is the only teardown path.
#[async_trait]
pub trait VirtualInterface: Send + Sync {
    /// Host-visible interface name.
    fn name(&self) -> &str;

    /// Tear the interface down, releasing the driver resource.
    async fn close(&mut self) -> PlatformResult<()>;
}

/// Handle to a running tunnel engine instance.
#[async_trait]
pub trait TunnelEngine: Send + Sync {
    /// Push a control document over the engine's configuration channel.
    async fn configure(&mut self, control_doc: &str) -> PlatformResult<()>;

    /// Bring the tunnel up.
    async fn up(&mut self) -> PlatformResult<()>;

    /// Shut the engine down.
    async fn close(&mut self) -> PlatformResult<()>;
}

/// Factory yielding virtual interface handles.
#[async_trait]
pub trait InterfaceFactory: Send + Sync {
    async fn create(&self, name: &str) -> PlatformResult<Box<dyn VirtualInterface>>;
}

/// Factory constructing an engine instance bound to an existing interface.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn launch(
        &self,
        interface: &dyn VirtualInterface,
    ) -> PlatformResult<Box<dyn TunnelEngine>>;
}

/// Probe for the platform driver dependency before any interface work.
pub trait DriverCheck: Send + Sync {
    /// Returns the location that satisfied the probe.
    fn ensure_available(&self) -> PlatformResult<PathBuf>;
}

/// Applies and removes the local address on the host network stack.
#[async_trait]
pub trait HostAddressing: Send + Sync {
    async fn assign(&self, interface: &str, address: &IpNet) -> PlatformResult<()>;
    async fn remove(&self, interface: &str, address: &IpNet) -> PlatformResult<()>;
}
