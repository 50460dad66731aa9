//! Host network-stack addressing via the platform's configuration command.
//!
//! Applying an address uses `ip` on Linux, `ifconfig` on macOS and `netsh`
//! on Windows. Every command runs under a bounded timeout so a wedged tool
//! cannot hang a Start indefinitely.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{HostAddressing, PlatformError, PlatformResult};

/// Default bound on host command execution.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// [`HostAddressing`] implementation backed by the platform's network
/// configuration command.
#[derive(Debug, Clone)]
pub struct CommandAddressing {
    timeout: Duration,
}

impl Default for CommandAddressing {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandAddressing {
    pub fn new() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, program: &str, args: &[String]) -> PlatformResult<String> {
        debug!(command = program, ?args, "running host command");

        let output = tokio::time::timeout(self.timeout, Command::new(program).args(args).output())
            .await
            .map_err(|_| PlatformError::Timeout(self.timeout))?
            .map_err(|e| PlatformError::Command(format!("failed to execute {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(command = program, status = %output.status, %stderr, "host command failed");
            return Err(PlatformError::Command(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl HostAddressing for CommandAddressing {
    async fn assign(&self, interface: &str, address: &IpNet) -> PlatformResult<()> {
        info!(interface, address = %address, "assigning interface address");
        for (program, args) in assign_invocations(interface, address) {
            self.run(program, &args).await?;
        }
        Ok(())
    }

    async fn remove(&self, interface: &str, address: &IpNet) -> PlatformResult<()> {
        info!(interface, address = %address, "removing interface address");
        let (program, args) = remove_invocation(interface, address);
        self.run(program, &args).await?;
        Ok(())
    }
}

/// Dotted-quad netmask for an IPv4 prefix length.
///
/// The netsh and ifconfig command forms take a mask, not a prefix.
pub fn ipv4_netmask(prefix_len: u8) -> Ipv4Addr {
    let bits = if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len.min(32)))
    };
    Ipv4Addr::from(bits)
}

#[cfg(target_os = "linux")]
fn assign_invocations(interface: &str, address: &IpNet) -> Vec<(&'static str, Vec<String>)> {
    vec![
        (
            "ip",
            args(&["addr", "add", &address.to_string(), "dev", interface]),
        ),
        ("ip", args(&["link", "set", "dev", interface, "up"])),
    ]
}

#[cfg(target_os = "linux")]
fn remove_invocation(interface: &str, address: &IpNet) -> (&'static str, Vec<String>) {
    (
        "ip",
        args(&["addr", "del", &address.to_string(), "dev", interface]),
    )
}

#[cfg(target_os = "macos")]
fn assign_invocations(interface: &str, address: &IpNet) -> Vec<(&'static str, Vec<String>)> {
    let invocation = match address {
        IpNet::V4(net) => args(&[
            interface,
            "inet",
            &net.addr().to_string(),
            &net.addr().to_string(),
            "netmask",
            &ipv4_netmask(net.prefix_len()).to_string(),
            "up",
        ]),
        IpNet::V6(net) => args(&[interface, "inet6", &net.to_string(), "up"]),
    };
    vec![("ifconfig", invocation)]
}

#[cfg(target_os = "macos")]
fn remove_invocation(interface: &str, address: &IpNet) -> (&'static str, Vec<String>) {
    let invocation = match address {
        IpNet::V4(net) => args(&[interface, "inet", &net.addr().to_string(), "delete"]),
        IpNet::V6(net) => args(&[interface, "inet6", &net.addr().to_string(), "delete"]),
    };
    ("ifconfig", invocation)
}

#[cfg(windows)]
fn assign_invocations(interface: &str, address: &IpNet) -> Vec<(&'static str, Vec<String>)> {
    let invocation = match address {
        IpNet::V4(net) => args(&[
            "interface",
            "ip",
            "set",
            "address",
            &format!("name=\"{}\"", interface),
            "static",
            &net.addr().to_string(),
            &ipv4_netmask(net.prefix_len()).to_string(),
        ]),
        IpNet::V6(net) => args(&[
            "interface",
            "ipv6",
            "set",
            "address",
            &format!("interface=\"{}\"", interface),
            &net.to_string(),
        ]),
    };
    vec![("netsh", invocation)]
}

#[cfg(windows)]
fn remove_invocation(interface: &str, address: &IpNet) -> (&'static str, Vec<String>) {
    let family = match address {
        IpNet::V4(_) => "ip",
        IpNet::V6(_) => "ipv6",
    };
    (
        "netsh",
        args(&[
            "interface",
            family,
            "delete",
            "address",
            &format!("name=\"{}\"", interface),
            &format!("addr={}", address.addr()),
        ]),
    )
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
