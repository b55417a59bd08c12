//! serpwatch runtime wiring.
//!
//! [`SerpMonitor`] owns the event dispatcher and the tab registry and ties
//! their lifecycles together: activation subscribes the registry's ingest
//! loop to the dispatcher's bus, deactivation shuts the dispatcher down and
//! stops the loop. Activation is deferred behind a short delay at startup
//! (the host may still be settling), and the one-time install ping runs on
//! its own delayed task.

pub mod simulate;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use serpwatch_dispatch::EventDispatcher;
use serpwatch_providers::ProviderRegistry;
use serpwatch_tab_registry::{ingest::IngestHandle, TabRegistry};
use serpwatch_telemetry::{cohort_enabled, send_install_ping, InstallStore, PingSink};

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub bus_capacity: usize,
    pub activation_delay_ms: u64,
    pub ping_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bus_capacity: 64,
            activation_delay_ms: 1_000,
            ping_delay_ms: 30_000,
        }
    }
}

/// Owns the SERP-monitoring pipeline for one process.
pub struct SerpMonitor {
    dispatcher: Arc<EventDispatcher>,
    registry: Arc<TabRegistry>,
    ingest: Option<IngestHandle>,
}

impl SerpMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        let providers = Arc::new(ProviderRegistry::builtin().clone());
        let (dispatcher, _rx) = EventDispatcher::new(providers, config.bus_capacity);
        Self {
            dispatcher: Arc::new(dispatcher),
            registry: Arc::new(TabRegistry::new()),
            ingest: None,
        }
    }

    /// Inbound surface for the host's navigation observers.
    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Read-only view for telemetry/activity collaborators.
    pub fn registry(&self) -> Arc<TabRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn is_active(&self) -> bool {
        self.ingest.is_some()
    }

    /// Starts consuming dispatcher messages into the registry. Idempotent;
    /// also a no-op once the dispatcher has been shut down.
    pub fn activate(&mut self) {
        if self.ingest.is_some() || self.dispatcher.is_disabled() {
            return;
        }
        let rx = self.dispatcher.subscribe();
        self.ingest = Some(IngestHandle::spawn(rx, Arc::clone(&self.registry)));
        info!("serp monitoring activated");
    }

    /// Shuts the dispatcher down and stops the ingest loop. Idempotent.
    /// Tabs still showing a SERP are abandoned, not deregistered.
    pub async fn deactivate(&mut self) {
        let Some(ingest) = self.ingest.take() else {
            return;
        };
        self.dispatcher.shutdown();
        ingest.shutdown().await;
        info!("serp monitoring deactivated");
    }
}

/// Background tasks spawned at startup.
#[derive(Default)]
pub struct StartupTasks {
    activation: Option<JoinHandle<()>>,
    ping: Option<JoinHandle<()>>,
}

impl StartupTasks {
    /// Waits for both delayed tasks to finish.
    pub async fn wait(self) {
        if let Some(task) = self.activation {
            let _ = task.await;
        }
        if let Some(task) = self.ping {
            let _ = task.await;
        }
    }

    pub fn abort(&self) {
        if let Some(task) = &self.activation {
            task.abort();
        }
        if let Some(task) = &self.ping {
            task.abort();
        }
    }
}

/// Process startup: checks the cohort gate, defers activation past the
/// startup race, and schedules the one-time install ping. Distribution
/// builds get no tasks at all.
pub fn start(
    monitor: Arc<tokio::sync::Mutex<SerpMonitor>>,
    store: Arc<dyn InstallStore>,
    sink: Arc<dyn PingSink>,
    config: &MonitorConfig,
) -> StartupTasks {
    if !cohort_enabled(store.as_ref()) {
        info!("not in cohort, serp monitoring stays off");
        return StartupTasks::default();
    }

    let activation_delay = Duration::from_millis(config.activation_delay_ms);
    let activation = tokio::spawn(async move {
        tokio::time::sleep(activation_delay).await;
        monitor.lock().await.activate();
    });

    let ping_delay = Duration::from_millis(config.ping_delay_ms);
    let ping = tokio::spawn(async move {
        tokio::time::sleep(ping_delay).await;
        if let Err(err) = send_install_ping(store.as_ref(), sink.as_ref()).await {
            warn!("install ping failed: {err}");
        }
    });

    StartupTasks {
        activation: Some(activation),
        ping: Some(ping),
    }
}
