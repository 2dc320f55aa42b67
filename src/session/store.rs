use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::analysis::{Analysis, Issue, Statistics};
use crate::capture::{CaptureMode, Packet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSession {
    pub packets: Vec<Packet>,
    pub analyses: Vec<Analysis>,
    /// `None` means the statistics stage produced nothing, not zero traffic.
    pub statistics: Option<Statistics>,
    pub issues: Vec<Issue>,
    /// `None` only for the empty session that exists before any capture.
    pub mode: Option<CaptureMode>,
}

impl CaptureSession {
    pub fn loaded(packets: Vec<Packet>) -> Self {
        Self {
            packets,
            analyses: Vec::new(),
            statistics: None,
            issues: Vec::new(),
            mode: Some(CaptureMode::Loaded),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn packet(&self, number: u32) -> Option<&Packet> {
        self.packets.iter().find(|p| p.number == number)
    }

    pub fn analysis_for(&self, number: u32) -> Option<&Analysis> {
        self.analyses.iter().find(|a| a.packet_number == number)
    }

    pub fn tabs(&self) -> TabAvailability {
        TabAvailability {
            packets: !self.packets.is_empty(),
            statistics: self.statistics.is_some(),
            issues: !self.issues.is_empty(),
        }
    }
}

// Capture and storage views are always available and not tracked here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabAvailability {
    pub packets: bool,
    pub statistics: bool,
    pub issues: bool,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub version: u64,
    pub session: Arc<CaptureSession>,
}

impl std::ops::Deref for SessionSnapshot {
    type Target = CaptureSession;

    fn deref(&self) -> &CaptureSession {
        &self.session
    }
}

/// Holds the current capture session.
///
/// Readers always see a whole session: publication swaps the entire value.
/// Writers must first obtain a [`SessionWriter`], and only one exists at a
/// time; a second writer waits until the first has published or given up.
pub struct SessionStore {
    current: watch::Sender<SessionSnapshot>,
    write_permit: Mutex<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(SessionSnapshot {
            version: 0,
            session: Arc::new(CaptureSession::default()),
        });
        Self {
            current,
            write_permit: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.current.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.borrow().version
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.current.subscribe()
    }

    pub async fn writer(&self) -> SessionWriter<'_> {
        let guard = self.write_permit.lock().await;
        SessionWriter { store: self, _guard: guard }
    }

    pub fn try_writer(&self) -> Option<SessionWriter<'_>> {
        self.write_permit
            .try_lock()
            .ok()
            .map(|guard| SessionWriter { store: self, _guard: guard })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to publish the next session. Dropping it without
/// publishing leaves the current session untouched.
pub struct SessionWriter<'a> {
    store: &'a SessionStore,
    _guard: MutexGuard<'a, ()>,
}

impl SessionWriter<'_> {
    pub fn current(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub fn publish(self, session: CaptureSession) -> SessionSnapshot {
        let snapshot = SessionSnapshot {
            version: self.store.version() + 1,
            session: Arc::new(session),
        };
        self.store.current.send_replace(snapshot.clone());
        log::debug!(
            "Published session v{} ({} packets)",
            snapshot.version,
            snapshot.packets.len()
        );
        snapshot
    }
}
