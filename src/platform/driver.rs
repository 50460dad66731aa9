//! Filesystem probe for the platform's virtual-interface driver.
//!
//! On Windows the driver is the `wintun.dll` redistributable, looked for next
//! to the executable and in the well-known install locations. On Linux the
//! TUN driver surfaces as `/dev/net/tun`. First match wins; finding nothing
//! is fatal to Start, before any interface work is attempted.

use std::path::PathBuf;

use tracing::debug;

use super::{DriverCheck, PlatformError, PlatformResult};

/// Probes a fixed list of filesystem locations for the driver.
#[derive(Debug, Clone)]
pub struct DriverProbe {
    paths: Vec<PathBuf>,
}

impl DriverProbe {
    /// Probe an explicit list of candidate locations.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// The platform's well-known driver locations.
    pub fn well_known() -> Self {
        Self::new(well_known_paths())
    }
}

impl DriverCheck for DriverProbe {
    fn ensure_available(&self) -> PlatformResult<PathBuf> {
        for path in &self.paths {
            if path.exists() {
                debug!(path = %path.display(), "driver probe satisfied");
                return Ok(path.clone());
            }
        }
        Err(PlatformError::DriverNotFound {
            searched: self.paths.len(),
        })
    }
}

#[cfg(windows)]
fn well_known_paths() -> Vec<PathBuf> {
    use std::env;

    let mut paths = Vec::new();
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.join("wintun.dll"));
        }
    }
    paths.push(PathBuf::from("wintun.dll"));
    for var in ["PROGRAMFILES", "PROGRAMFILES(X86)"] {
        if let Ok(base) = env::var(var) {
            paths.push(PathBuf::from(base).join("WireGuard").join("wintun.dll"));
        }
    }
    if let Ok(root) = env::var("SYSTEMROOT") {
        paths.push(PathBuf::from(&root).join("System32").join("wintun.dll"));
        paths.push(PathBuf::from(&root).join("SysWOW64").join("wintun.dll"));
    }
    paths
}

#[cfg(target_os = "linux")]
fn well_known_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("/dev/net/tun")]
}

#[cfg(all(unix, not(target_os = "linux")))]
fn well_known_paths() -> Vec<PathBuf> {
    // utun devices are built into the kernel on macOS and the BSDs; /dev
    // existing is the closest meaningful presence check.
    vec![PathBuf::from("/dev")]
}
