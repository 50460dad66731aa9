//! Tunnel lifecycle: registry of active tunnels and the start/stop/status
//! state machine driving the platform collaborators.

pub mod error;
pub mod manager;
pub mod registry;
pub mod types;

pub use error::{TunnelError, TunnelResult};
pub use manager::TunnelManager;
pub use registry::{ActiveTunnel, TunnelRegistry};
pub use types::{StopReport, TunnelId, TunnelStatus};
