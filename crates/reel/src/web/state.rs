use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::media::MediaTools;
use crate::types::SessionConfig;

/// State shared by every connection. Only immutable configuration, the
/// collaborator set, and bookkeeping live here; sessions are per-connection.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SessionConfig>,
    pub tools: MediaTools,
    /// Cancelled on server shutdown. Interrupts connections blocked in dispatch.
    pub shutdown: CancellationToken,
    start_time: Instant,
    connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: SessionConfig, tools: MediaTools, shutdown: CancellationToken) -> Self {
        AppState {
            config: Arc::new(config),
            tools,
            shutdown,
            start_time: Instant::now(),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.config), self.tools.clone())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn active_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Count a connection as active until the returned guard drops.
    pub fn track_connection(&self) -> ConnectionGuard {
        self.connections.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            connections: Arc::clone(&self.connections),
        }
    }
}

pub struct ConnectionGuard {
    connections: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }
}
