//! Start/Stop/Status orchestration.
//!
//! Start sequences the side-effecting steps -- driver probe, interface
//! creation, engine construction, control push, activation, host addressing
//! -- and unwinds in reverse acquisition order on any failure. Registration
//! comes last, so a registry entry always means a fully operational tunnel.
//! Stop reverses the sequence using only the identity, re-parsing the config
//! to recover the address for best-effort cleanup.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::WgConfig;
use crate::platform::{
    DriverCheck, EngineFactory, HostAddressing, InterfaceFactory, PlatformError, TunnelEngine,
    VirtualInterface,
};
use crate::tunnel::error::{TunnelError, TunnelResult};
use crate::tunnel::registry::{ActiveTunnel, TunnelRegistry};
use crate::tunnel::types::{StopReport, TunnelId, TunnelStatus};
use crate::uapi;

/// Interface name used when the caller does not choose one.
pub const DEFAULT_INTERFACE_NAME: &str = "myvpn0";

/// Drives tunnels through their lifecycle against a set of platform
/// collaborators. One manager (and its registry) is shared by reference
/// among all callers of start/stop/status.
pub struct TunnelManager {
    registry: Arc<TunnelRegistry>,
    driver: Arc<dyn DriverCheck>,
    interfaces: Arc<dyn InterfaceFactory>,
    engines: Arc<dyn EngineFactory>,
    addressing: Arc<dyn HostAddressing>,
    interface_name: String,
}

impl TunnelManager {
    pub fn new(
        driver: Arc<dyn DriverCheck>,
        interfaces: Arc<dyn InterfaceFactory>,
        engines: Arc<dyn EngineFactory>,
        addressing: Arc<dyn HostAddressing>,
    ) -> Self {
        TunnelManager {
            registry: Arc::new(TunnelRegistry::new()),
            driver,
            interfaces,
            engines,
            addressing,
            interface_name: DEFAULT_INTERFACE_NAME.to_string(),
        }
    }

    /// Override the name used for created interfaces.
    pub fn with_interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = name.into();
        self
    }

    /// The registry backing this manager.
    pub fn registry(&self) -> &TunnelRegistry {
        &self.registry
    }

    /// Start the tunnel described by `config_path`.
    ///
    /// The multi-step sequence runs outside the registry lock; two concurrent
    /// starts for the same identity may both reach the final registration,
    /// where exactly one wins and the loser rolls back its resources and
    /// reports [`TunnelError::AlreadyActive`].
    pub async fn start(&self, config_path: impl AsRef<Path>) -> TunnelResult<()> {
        let path = config_path.as_ref();
        let id = TunnelId::from(path);
        info!(tunnel_id = %id, "starting tunnel");

        // The local address must be known before any resource is touched; a
        // config that cannot address the interface fails with nothing to
        // unwind.
        let config = WgConfig::load(path)?;
        let address = config.address.ok_or(TunnelError::MissingAddress)?;

        self.driver
            .ensure_available()
            .map_err(|e| TunnelError::DriverUnavailable(e.to_string()))?;

        let mut interface = self
            .interfaces
            .create(&self.interface_name)
            .await
            .map_err(|e| TunnelError::InterfaceCreateFailed(e.to_string()))?;

        let mut engine = match self.engines.launch(interface.as_ref()).await {
            Ok(engine) => engine,
            Err(e) => {
                close_interface(&id, &mut interface).await;
                return Err(step_error(e, TunnelError::EngineConfigureFailed));
            }
        };

        let control_doc = uapi::render(&config).await;
        if let Err(e) = engine.configure(&control_doc).await {
            unwind(&id, &mut engine, &mut interface).await;
            return Err(step_error(e, TunnelError::EngineConfigureFailed));
        }

        if let Err(e) = engine.up().await {
            unwind(&id, &mut engine, &mut interface).await;
            return Err(step_error(e, TunnelError::EngineActivateFailed));
        }

        // A tunnel that is cryptographically up but has no usable host
        // address is a failed start, not a degraded success.
        if let Err(e) = self.addressing.assign(interface.name(), &address).await {
            unwind(&id, &mut engine, &mut interface).await;
            return Err(step_error(e, TunnelError::AddressingFailed));
        }

        let entry = ActiveTunnel {
            id: id.clone(),
            engine,
            interface,
        };
        if let Err(mut rejected) = self.registry.register(entry) {
            warn!(tunnel_id = %id, "lost registration race, rolling back");
            unwind(&id, &mut rejected.engine, &mut rejected.interface).await;
            return Err(TunnelError::AlreadyActive(id));
        }

        info!(tunnel_id = %id, interface = %self.interface_name, "tunnel active");
        Ok(())
    }

    /// Stop the tunnel for `config_path`. Idempotent: an absent tunnel is a
    /// successful no-op, whether it never started or was stopped
    /// concurrently.
    pub async fn stop(&self, config_path: impl AsRef<Path>) -> TunnelResult<StopReport> {
        let path = config_path.as_ref();
        let id = TunnelId::from(path);

        let Some(mut entry) = self.registry.unregister(&id) else {
            debug!(tunnel_id = %id, "no active tunnel, stop is a no-op");
            return Ok(StopReport::not_running());
        };

        info!(tunnel_id = %id, "stopping tunnel");
        let mut report = StopReport::stopped();

        // Close both handles independently; one failing must not stop the
        // other from being attempted.
        if let Err(e) = entry.engine.close().await {
            warn!(tunnel_id = %id, error = %e, "engine close failed");
            report.warnings.push(format!("engine close failed: {}", e));
        }
        if let Err(e) = entry.interface.close().await {
            warn!(tunnel_id = %id, error = %e, "interface close failed");
            report.warnings.push(format!("interface close failed: {}", e));
        }

        // Address cleanup is a courtesy: only the identity survives, so the
        // address is re-derived from the config, and any failure is a
        // warning, never fatal.
        match WgConfig::load(path) {
            Ok(config) => match config.address {
                Some(address) => {
                    if let Err(e) = self.addressing.remove(entry.interface.name(), &address).await
                    {
                        warn!(tunnel_id = %id, error = %e, "address cleanup failed");
                        report.warnings.push(format!("address cleanup failed: {}", e));
                    }
                }
                None => {
                    report
                        .warnings
                        .push("config has no Address entry; skipped address cleanup".to_string());
                }
            },
            Err(e) => {
                warn!(tunnel_id = %id, error = %e, "could not re-read config for address cleanup");
                report
                    .warnings
                    .push(format!("could not re-read config for address cleanup: {}", e));
            }
        }

        info!(tunnel_id = %id, warnings = report.warnings.len(), "tunnel stopped");
        Ok(report)
    }

    /// Report whether a tunnel is active for `config_path`.
    ///
    /// Pure registry lookup; engine internals are never inspected.
    pub fn status(&self, config_path: impl AsRef<Path>) -> TunnelStatus {
        let id = TunnelId::from(config_path.as_ref());
        if self.registry.contains(&id) {
            TunnelStatus::Connected
        } else {
            TunnelStatus::Disconnected
        }
    }
}

/// Map a collaborator failure to the step's error, preserving timeouts.
fn step_error(e: PlatformError, wrap: fn(String) -> TunnelError) -> TunnelError {
    match e {
        PlatformError::Timeout(bound) => TunnelError::Timeout(format!("after {:?}", bound)),
        other => wrap(other.to_string()),
    }
}

/// Release both handles in reverse acquisition order. Unwind failures are
/// logged and swallowed; the original step error is what the caller sees.
async fn unwind(
    id: &TunnelId,
    engine: &mut Box<dyn TunnelEngine>,
    interface: &mut Box<dyn VirtualInterface>,
) {
    if let Err(e) = engine.close().await {
        warn!(tunnel_id = %id, error = %e, "engine close failed during unwind");
    }
    close_interface(id, interface).await;
}

async fn close_interface(id: &TunnelId, interface: &mut Box<dyn VirtualInterface>) {
    if let Err(e) = interface.close().await {
        warn!(tunnel_id = %id, error = %e, "interface close failed during unwind");
    }
}
