use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::backend::{Backend, HttpBackend};
use crate::capture::{CaptureOrchestrator, Packet};
use crate::config::Config;
use crate::error::Result;
use crate::filter::{distinct_protocols, FilterCriteria};
use crate::monitor::{ConnectionState, ConnectivityMonitor, ProbeScheduler};
use crate::session::{SessionSnapshot, SessionStore};
use crate::storage::{CaptureStorage, StorageFormat, StoredCaptureRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Capture,
    Packets,
    Statistics,
    Issues,
    Storage,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Capture, Tab::Packets, Tab::Statistics, Tab::Issues, Tab::Storage];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Capture => "Capture",
            Tab::Packets => "Packets",
            Tab::Statistics => "Statistics",
            Tab::Issues => "Issues",
            Tab::Storage => "Storage",
        }
    }
}

pub struct App {
    pub config: Config,
    store: Arc<SessionStore>,
    monitor: Arc<ConnectivityMonitor>,
    orchestrator: CaptureOrchestrator,
    storage: CaptureStorage,
    scheduler: Option<ProbeScheduler>,
    selected_tab: Tab,
    filter: FilterCriteria,
}

impl App {
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> App {
        let store = Arc::new(SessionStore::new());
        let monitor = Arc::new(ConnectivityMonitor::new(
            backend.clone(),
            Duration::from_millis(config.monitor.probe_timeout_ms),
        ));
        let orchestrator = CaptureOrchestrator::new(backend.clone(), store.clone(), config.capture.max_count);
        let storage = CaptureStorage::new(backend, store.clone());

        App {
            config,
            store,
            monitor,
            orchestrator,
            storage,
            scheduler: None,
            selected_tab: Tab::Capture,
            filter: FilterCriteria::default(),
        }
    }

    pub fn connect(config: Config) -> Result<App> {
        let backend = HttpBackend::from_config(&config.backend)?;
        Ok(App::new(config, Arc::new(backend)))
    }

    pub fn session(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    // Connectivity

    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.monitor.subscribe()
    }

    pub async fn test_connection(&self) -> ConnectionState {
        self.monitor.probe().await
    }

    pub fn start_monitoring(&mut self) {
        if self.scheduler.as_ref().is_some_and(ProbeScheduler::is_running) {
            return;
        }
        let interval = Duration::from_secs(self.config.monitor.poll_interval_secs);
        self.scheduler = Some(self.monitor.spawn_scheduler(interval));
    }

    pub async fn stop_monitoring(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }
    }

    // Capture pipeline

    pub async fn capture(&mut self, count: Option<u32>, real_capture: Option<bool>) -> Result<SessionSnapshot> {
        let count = count.unwrap_or(self.config.capture.default_count);
        let real_capture = real_capture.unwrap_or(self.config.capture.real_capture);

        let session = self.orchestrator.run_capture(count, real_capture).await?;
        self.selected_tab = Tab::Packets;
        Ok(session)
    }

    pub async fn reanalyze(&mut self) -> Result<SessionSnapshot> {
        self.orchestrator.reanalyze().await
    }

    // Storage

    pub async fn save(&self, name: &str, format: Option<StorageFormat>) -> Result<Option<StoredCaptureRecord>> {
        let format = format.unwrap_or(self.config.storage.default_format);
        self.storage.save_current(name, format).await
    }

    pub async fn refresh_saved(&self) -> Result<Vec<StoredCaptureRecord>> {
        self.storage.list().await
    }

    pub fn saved_captures(&self) -> Vec<StoredCaptureRecord> {
        self.storage.cached_index()
    }

    pub async fn load(&mut self, name: &str) -> Result<SessionSnapshot> {
        let session = self.storage.load(name).await?;
        self.selected_tab = Tab::Packets;
        Ok(session)
    }

    // Consent is the caller's job.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.storage.delete(name).await
    }

    // Filtering

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.filter = criteria;
    }

    pub fn clear_filter(&mut self) {
        self.filter = FilterCriteria::default();
    }

    pub fn visible_packets(&self) -> Vec<Packet> {
        self.filter.apply(&self.session().packets)
    }

    pub fn protocol_choices(&self) -> BTreeSet<String> {
        distinct_protocols(&self.session().packets)
    }

    // Tabs

    pub fn tab_enabled(&self, tab: Tab) -> bool {
        let available = self.session().tabs();
        match tab {
            Tab::Capture | Tab::Storage => true,
            Tab::Packets => available.packets,
            Tab::Statistics => available.statistics,
            Tab::Issues => available.issues,
        }
    }

    pub fn select_tab(&mut self, tab: Tab) -> bool {
        if !self.tab_enabled(tab) {
            return false;
        }
        self.selected_tab = tab;
        true
    }

    // Falls back to Capture once the selection has nothing to show.
    pub fn selected_tab(&self) -> Tab {
        if self.tab_enabled(self.selected_tab) {
            self.selected_tab
        } else {
            Tab::Capture
        }
    }

    pub fn next_tab(&mut self) -> Tab {
        let current = Tab::ALL
            .iter()
            .position(|t| *t == self.selected_tab())
            .unwrap_or(0);
        for step in 1..=Tab::ALL.len() {
            let candidate = Tab::ALL[(current + step) % Tab::ALL.len()];
            if self.tab_enabled(candidate) {
                self.selected_tab = candidate;
                break;
            }
        }
        self.selected_tab
    }
}
