//! Userspace WireGuard engine collaborators.
//!
//! The production engine is an external userspace implementation
//! (`wireguard-go` or a compatible one). Launching it with an interface name
//! makes it create the virtual interface and listen for control transactions
//! on a UNIX socket under `/var/run/wireguard/<name>.sock`. This module
//! provides both sides of that arrangement: an [`InterfaceFactory`] that
//! spawns the process, and an [`EngineFactory`] whose handles speak the
//! `set=1`/`get=1` control transactions over the socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::{
    EngineFactory, InterfaceFactory, PlatformError, PlatformResult, TunnelEngine, VirtualInterface,
};

/// Where userspace implementations publish their control sockets.
pub const SOCKET_DIR: &str = "/var/run/wireguard";

/// Bound on engine control transactions and process startup.
pub const ENGINE_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns a userspace WireGuard process per interface.
#[derive(Debug, Clone)]
pub struct UserspaceWgFactory {
    program: String,
    socket_dir: PathBuf,
}

impl UserspaceWgFactory {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            socket_dir: PathBuf::from(SOCKET_DIR),
        }
    }
}

impl Default for UserspaceWgFactory {
    fn default() -> Self {
        Self::new("wireguard-go")
    }
}

#[async_trait]
impl InterfaceFactory for UserspaceWgFactory {
    async fn create(&self, name: &str) -> PlatformResult<Box<dyn VirtualInterface>> {
        info!(program = %self.program, interface = name, "spawning userspace engine process");

        let child = Command::new(&self.program)
            .arg("-f")
            .arg(name)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PlatformError::Interface(format!("failed to spawn {}: {}", self.program, e))
            })?;

        let socket_path = self.socket_dir.join(format!("{}.sock", name));
        wait_for_socket(&socket_path).await?;

        Ok(Box::new(UserspaceInterface {
            name: name.to_string(),
            child: Some(child),
        }))
    }
}

/// Poll for the control socket so configuration does not race startup.
async fn wait_for_socket(path: &Path) -> PlatformResult<()> {
    let deadline = tokio::time::Instant::now() + ENGINE_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if path.exists() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(PlatformError::Timeout(ENGINE_TIMEOUT))
}

/// A virtual interface backed by a spawned userspace process. Killing the
/// process removes the interface.
struct UserspaceInterface {
    name: String,
    child: Option<Child>,
}

#[async_trait]
impl VirtualInterface for UserspaceInterface {
    fn name(&self) -> &str {
        &self.name
    }

    async fn close(&mut self) -> PlatformResult<()> {
        if let Some(mut child) = self.child.take() {
            debug!(interface = %self.name, "terminating userspace engine process");
            child
                .kill()
                .await
                .map_err(|e| PlatformError::Interface(format!("failed to kill engine: {}", e)))?;
        }
        Ok(())
    }
}

/// Builds engine handles that talk the control protocol over the per-interface
/// UNIX socket.
#[derive(Debug, Clone)]
pub struct UapiEngineFactory {
    socket_dir: PathBuf,
}

impl UapiEngineFactory {
    pub fn new() -> Self {
        Self {
            socket_dir: PathBuf::from(SOCKET_DIR),
        }
    }
}

impl Default for UapiEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineFactory for UapiEngineFactory {
    async fn launch(
        &self,
        interface: &dyn VirtualInterface,
    ) -> PlatformResult<Box<dyn TunnelEngine>> {
        let socket_path = self.socket_dir.join(format!("{}.sock", interface.name()));
        Ok(Box::new(UapiEngine { socket_path }))
    }
}

struct UapiEngine {
    socket_path: PathBuf,
}

impl UapiEngine {
    /// Run one control transaction: a request block followed by a blank line,
    /// answered by `key=value` lines ending with `errno=N` and a blank line.
    async fn transact(&self, request: &str) -> PlatformResult<()> {
        let run = async {
            let stream = UnixStream::connect(&self.socket_path).await?;
            let (read_half, mut write_half) = stream.into_split();

            write_half.write_all(request.as_bytes()).await?;
            write_half.write_all(b"\n").await?;

            let mut lines = BufReader::new(read_half).lines();
            let mut errno: Option<i32> = None;
            while let Some(line) = lines.next_line().await? {
                if line.is_empty() {
                    break;
                }
                if let Some(value) = line.strip_prefix("errno=") {
                    errno = value.parse().ok();
                }
            }
            Ok::<Option<i32>, std::io::Error>(errno)
        };

        let errno = tokio::time::timeout(ENGINE_TIMEOUT, run)
            .await
            .map_err(|_| PlatformError::Timeout(ENGINE_TIMEOUT))?
            .map_err(|e| PlatformError::Engine(format!("control socket I/O failed: {}", e)))?;

        match errno {
            Some(0) => Ok(()),
            Some(code) => Err(PlatformError::Engine(format!(
                "engine rejected request with errno={}",
                code
            ))),
            None => Err(PlatformError::Engine(
                "engine reply carried no errno line".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TunnelEngine for UapiEngine {
    async fn configure(&mut self, control_doc: &str) -> PlatformResult<()> {
        debug!(socket = %self.socket_path.display(), "pushing control document");
        self.transact(&format!("set=1\n{}", control_doc)).await
    }

    async fn up(&mut self) -> PlatformResult<()> {
        // A userspace engine is live once configured; a get transaction
        // confirms it is answering before the tunnel is declared up.
        self.transact("get=1\n").await
    }

    async fn close(&mut self) -> PlatformResult<()> {
        // The engine process is owned by its interface handle and exits when
        // that handle is closed; there is nothing to release here.
        debug!(socket = %self.socket_path.display(), "engine handle closed; process follows its interface");
        Ok(())
    }
}
