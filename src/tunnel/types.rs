//! Type definitions for the tunnel module.

use std::fmt;
use std::path::Path;

/// Identity of one tunnel instance: the configuration file path that started
/// it, exactly as supplied by the caller. Opaque -- the registry never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TunnelId(pub String);

impl fmt::Display for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TunnelId {
    fn from(s: String) -> Self {
        TunnelId(s)
    }
}

impl From<&str> for TunnelId {
    fn from(s: &str) -> Self {
        TunnelId(s.to_string())
    }
}

impl From<&Path> for TunnelId {
    fn from(path: &Path) -> Self {
        TunnelId(path.to_string_lossy().into_owned())
    }
}

/// Status of a tunnel as reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelStatus {
    /// A fully started tunnel is registered for this identity
    Connected,
    /// No registry entry for this identity
    Disconnected,
}

impl fmt::Display for TunnelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelStatus::Connected => write!(f, "CONNECTED"),
            TunnelStatus::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

/// Outcome of a Stop call.
///
/// Stop is idempotent and its cleanup is best-effort, so failures along the
/// way surface as warnings instead of errors. `was_active` distinguishes "a
/// tunnel was torn down" from "there was nothing to stop"; both are success.
#[derive(Debug, Clone, Default)]
pub struct StopReport {
    /// Whether a registered tunnel was actually torn down
    pub was_active: bool,

    /// Non-fatal cleanup problems encountered on the way down
    pub warnings: Vec<String>,
}

impl StopReport {
    /// A stop that found no active tunnel.
    pub fn not_running() -> Self {
        StopReport::default()
    }

    /// A stop that tore down an active tunnel.
    pub fn stopped() -> Self {
        StopReport {
            was_active: true,
            warnings: Vec::new(),
        }
    }

    /// True when teardown finished without cleanup warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
