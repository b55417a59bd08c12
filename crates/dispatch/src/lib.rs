//! Routes host navigation/unload signals to per-tab trackers and publishes
//! the resulting register/deregister transitions as [`SerpMessage`]s on a
//! broadcast bus.
//!
//! Trackers are created lazily on first sight of a tab and discarded on
//! unload. A shutdown signal disables the dispatcher idempotently: further
//! events are ignored and any still-active SERPs are abandoned without a
//! deregistration (teardown is not worth the cost).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use serpwatch_core_types::{SerpMessage, TabId};
use serpwatch_detect::{Navigation, PageLoad, SerpEvent, SerpTracker};
use serpwatch_providers::ProviderRegistry;

pub struct EventDispatcher {
    providers: Arc<ProviderRegistry>,
    trackers: DashMap<TabId, Mutex<SerpTracker>>,
    bus: broadcast::Sender<SerpMessage>,
    disabled: AtomicBool,
}

impl EventDispatcher {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        capacity: usize,
    ) -> (Self, broadcast::Receiver<SerpMessage>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (
            Self {
                providers,
                trackers: DashMap::new(),
                bus: tx,
                disabled: AtomicBool::new(false),
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SerpMessage> {
        self.bus.subscribe()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Location-change signal for a tab's top frame or a subframe.
    pub fn on_location_change(&self, tab: &TabId, nav: &Navigation) {
        if self.is_disabled() {
            return;
        }
        let events = {
            let cell = self
                .trackers
                .entry(tab.clone())
                .or_insert_with(|| Mutex::new(SerpTracker::new()));
            let mut tracker = cell.lock();
            tracker.on_navigation(nav, &self.providers)
        };
        self.publish_all(tab, events);
    }

    /// Page-content-loaded signal, for the cookie-gated path.
    pub fn on_page_load(&self, tab: &TabId, load: &PageLoad) {
        if self.is_disabled() {
            return;
        }
        let events = {
            let cell = self
                .trackers
                .entry(tab.clone())
                .or_insert_with(|| Mutex::new(SerpTracker::new()));
            let mut tracker = cell.lock();
            tracker.on_page_load(load, &self.providers)
        };
        self.publish_all(tab, events);
    }

    /// Tab/frame teardown: closes out a still-active SERP and discards the
    /// tracker. Unknown tabs are a no-op.
    pub fn on_unload(&self, tab: &TabId) {
        if self.is_disabled() {
            return;
        }
        if let Some((_, cell)) = self.trackers.remove(tab) {
            let mut tracker = cell.into_inner();
            if let Some(event) = tracker.on_unload() {
                self.publish(message_for(tab, event));
            }
        }
    }

    /// Disables all further event processing and broadcasts `Shutdown`.
    /// Idempotent: a second call does nothing. Trackers are dropped as-is;
    /// their active SERPs are intentionally not deregistered.
    pub fn shutdown(&self) {
        if self.disabled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("dispatcher shutting down");
        self.trackers.clear();
        self.publish(SerpMessage::Shutdown);
    }

    /// Number of tabs currently tracked (active or idle).
    pub fn tracked_tabs(&self) -> usize {
        self.trackers.len()
    }

    fn publish_all(&self, tab: &TabId, events: Vec<SerpEvent>) {
        for event in events {
            self.publish(message_for(tab, event));
        }
    }

    fn publish(&self, message: SerpMessage) {
        trace!(name = message.name(), "publishing message");
        // Delivery is fire-and-forget; with no receivers the message is
        // dropped.
        let _ = self.bus.send(message);
    }
}

fn message_for(tab: &TabId, event: SerpEvent) -> SerpMessage {
    match event {
        SerpEvent::Register { code, sap, url } => SerpMessage::RegisterSerp {
            tab: tab.clone(),
            code,
            sap,
            url,
        },
        SerpEvent::Deregister { url } => SerpMessage::DeregisterSerp {
            tab: tab.clone(),
            url,
        },
    }
}
