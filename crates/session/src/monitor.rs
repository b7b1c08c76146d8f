//! Background connectivity tracking.
//!
//! A [`ConnectivityMonitor`] holds the current online flag and publishes
//! changes over a `watch` channel. A spawned task polls a [`Probe`] on an
//! interval and feeds its answers back into the monitor.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parley_config::ConnectivityConfig;
use parley_core::connectivity::Connectivity;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A single reachability check.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Considers the network up when a TCP connection to `addr` opens in time.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(
            format!("{}:{}", config.probe_host, config.probe_port),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "Connectivity probe failed");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "Connectivity probe timed out");
                false
            }
        }
    }
}

/// Shared online/offline state.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    /// Receive every online/offline transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Record the latest observation. Subscribers only wake on a change.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            if online {
                info!("Connectivity restored");
            } else {
                warn!("Connectivity lost");
            }
        }
    }

    /// Poll `probe` every `interval` until the monitor is dropped.
    pub fn spawn_probe(self: &Arc<Self>, probe: Arc<dyn Probe>, interval: Duration) -> JoinHandle<()> {
        let monitor: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let online = probe.check().await;
                let Some(monitor) = monitor.upgrade() else {
                    debug!("Connectivity monitor dropped, stopping probe");
                    break;
                };
                monitor.set_online(online);
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.state.borrow()
    }
}
