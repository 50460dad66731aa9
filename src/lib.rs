//! wgbridge drives an external WireGuard-style tunnel engine from
//! `[Interface]`/`[Peer]` configuration files.
//!
//! The crate does no cryptography of its own. It parses the configuration
//! format, translates it into the engine's line-oriented `key=value` control
//! protocol, and sequences the start/stop lifecycle against a set of
//! platform collaborators (driver probe, virtual interface factory, tunnel
//! engine, host addressing). A concurrency-safe registry keyed by the
//! configuration file path records which tunnels are currently up.

pub mod config;
pub mod logging;
pub mod platform;
pub mod tunnel;
pub mod uapi;

// Re-export the types most callers need
pub use config::{Key, PeerSection, WgConfig};
pub use tunnel::{StopReport, TunnelId, TunnelManager, TunnelRegistry, TunnelStatus};
