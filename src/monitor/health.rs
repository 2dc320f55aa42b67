use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unknown,
    Connected,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Unknown => write!(f, "unknown"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// Tracks whether the service is reachable.
///
/// Every probe is a single bounded attempt and its outcome becomes the new
/// state. When probes overlap, the one that finishes last wins.
pub struct ConnectivityMonitor {
    backend: Arc<dyn Backend>,
    probe_timeout: Duration,
    state: watch::Sender<ConnectionState>,
}

impl ConnectivityMonitor {
    pub fn new(backend: Arc<dyn Backend>, probe_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Unknown);
        Self {
            backend,
            probe_timeout,
            state,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub async fn probe(&self) -> ConnectionState {
        let outcome = match tokio::time::timeout(self.probe_timeout, self.backend.health()).await {
            Ok(Ok(())) => ConnectionState::Connected,
            Ok(Err(e)) => {
                log::debug!("Health probe failed: {}", e);
                ConnectionState::Error
            }
            Err(_) => {
                log::debug!("Health probe timed out after {:?}", self.probe_timeout);
                ConnectionState::Error
            }
        };

        let previous = self.state.send_replace(outcome);
        if previous != outcome {
            log::info!("Backend connection {} -> {}", previous, outcome);
        }
        outcome
    }

    /// Starts re-probing every `interval` for as long as the last completed
    /// probe reported `Connected`.
    ///
    /// While the state is anything else the schedule is dormant; a probe that
    /// reports `Connected` re-arms it. Any completed probe, including one
    /// made directly through [`probe`](Self::probe), restarts the interval.
    pub fn spawn_scheduler(self: &Arc<Self>, interval: Duration) -> ProbeScheduler {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_schedule(self.clone(), interval, cancel.clone()));
        ProbeScheduler {
            cancel,
            task: Some(task),
        }
    }
}

async fn run_schedule(monitor: Arc<ConnectivityMonitor>, interval: Duration, cancel: CancellationToken) {
    let mut updates = monitor.subscribe();

    loop {
        let connected = *updates.borrow_and_update() == ConnectionState::Connected;

        if !connected {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {
                monitor.probe().await;
            }
        }
    }

    log::debug!("Probe schedule stopped");
}

/// Owner of the background probe task. Dropping it stops the schedule.
pub struct ProbeScheduler {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProbeScheduler {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the schedule and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("Probe schedule ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ProbeScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
