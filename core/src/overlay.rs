//! Overlay lifecycle and UI binding: the rendered-vector store, the
//! reference-counted loading indicator, z-order upkeep, and host event
//! wiring.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use roadlens_protocol::RoadVector;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::settings::SettingsStore;
use crate::sync::Orchestrator;
use crate::zoom_badge::ZoomBadge;

/// Z-index the overlay claims on the host map; the host is known to shuffle
/// layers behind our back, so it is re-asserted on a poll.
pub const OVERLAY_Z_INDEX: i32 = 350;

/// The single rendered-vector store. Mutated only by the orchestrator's
/// commit step and by the visibility toggle.
pub struct Overlay {
    vectors: Vec<RoadVector>,
    visible: bool,
    z_index: i32,
}

impl Overlay {
    pub fn new(visible: bool) -> Self {
        Self {
            vectors: Vec::new(),
            visible,
            z_index: OVERLAY_Z_INDEX,
        }
    }

    /// Atomic swap: the previous contents disappear and the new contents
    /// appear in one step; a half-updated overlay is never observable.
    pub fn replace(&mut self, vectors: Vec<RoadVector>) {
        self.vectors = vectors;
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    pub fn vectors(&self) -> &[RoadVector] {
        &self.vectors
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Entry point for host-imposed drift.
    pub fn set_z_index(&mut self, z_index: i32) {
        self.z_index = z_index;
    }

    /// Restores the claimed z-index; returns whether a correction was
    /// needed.
    pub fn ensure_z_order(&mut self) -> bool {
        if self.z_index == OVERLAY_Z_INDEX {
            return false;
        }
        debug!(drifted = self.z_index, "correcting overlay z-order");
        self.z_index = OVERLAY_Z_INDEX;
        true
    }
}

/// Reference-counted loading state shared by overlapping rounds: rapid pan
/// events show one continuous "Loading…" until the last round finishes.
#[derive(Default)]
pub struct StatusIndicator {
    active: AtomicUsize,
    error: StdMutex<Option<&'static str>>,
}

/// Indicator text while any round is active.
pub const LOADING_TEXT: &str = "Loading…";

impl StatusIndicator {
    pub fn begin(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut error) = self.error.lock() {
            *error = None;
        }
    }

    /// Decrements the active count, never below zero.
    pub fn finish(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_error(&self, message: &'static str) {
        if let Ok(mut error) = self.error.lock() {
            *error = Some(message);
        }
    }

    /// `"Loading…"` while any round is active, the error line after a fully
    /// failed round, empty otherwise.
    pub fn text(&self) -> &'static str {
        if self.active_count() > 0 {
            return LOADING_TEXT;
        }
        self.error
            .lock()
            .ok()
            .and_then(|error| *error)
            .unwrap_or("")
    }

    /// Begin now, finish on drop: one decrement per round on every exit
    /// path.
    pub fn loading_guard(self: &Arc<Self>) -> LoadingGuard {
        self.begin();
        LoadingGuard {
            status: self.clone(),
        }
    }
}

pub struct LoadingGuard {
    status: Arc<StatusIndicator>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.status.finish();
    }
}

/// Notifications from the host editor that the binding reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// Pan or zoom finished; the viewport settled.
    MoveEnd,
    /// The host cleared its action stack (post-save); its DOM may have been
    /// rebuilt, so the zoom badge needs re-attaching.
    ActionsCleared,
    /// The layer-switcher checkbox for the overlay.
    OverlayToggled(bool),
    /// The settings-panel checkbox for street highlighting.
    HighlightToggled(bool),
}

/// Wires host events to the orchestrator, settings persistence, and the
/// zoom badge.
pub struct OverlayController {
    orchestrator: Arc<Orchestrator>,
    store: SettingsStore,
    badge: ZoomBadge,
}

impl OverlayController {
    pub fn new(orchestrator: Arc<Orchestrator>, store: SettingsStore) -> Self {
        Self {
            orchestrator,
            store,
            badge: ZoomBadge::default(),
        }
    }

    pub fn badge(&self) -> &ZoomBadge {
        &self.badge
    }

    pub async fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::MoveEnd => {
                self.badge.update(self.orchestrator.host().zoom());
                self.orchestrator.trigger_sync().await;
            }
            HostEvent::ActionsCleared => {
                self.badge.reattach(self.orchestrator.host().zoom());
            }
            HostEvent::OverlayToggled(visible) => {
                self.persist(|settings| settings.layer_visible = visible)
                    .await;
                self.orchestrator.overlay().lock().await.set_visible(visible);
                info!(visible, "overlay visibility toggled");
                if visible {
                    self.orchestrator.trigger_sync().await;
                }
            }
            HostEvent::HighlightToggled(enabled) => {
                self.persist(|settings| settings.road_type_enabled = enabled)
                    .await;
                info!(enabled, "street highlighting toggled");
                self.orchestrator.trigger_sync().await;
            }
        }
    }

    /// Re-asserts the overlay z-index once; the embedder drives the poll
    /// via [`run_z_order_poll`].
    pub async fn enforce_z_order(&self) {
        self.orchestrator.overlay().lock().await.ensure_z_order();
    }

    async fn persist(&self, update: impl FnOnce(&mut roadlens_protocol::Settings)) {
        let settings = self.orchestrator.settings();
        let mut settings = settings.lock().await;
        update(&mut settings);
        if let Err(err) = self.store.save(&settings) {
            warn!(error = %err, "failed to persist settings");
        }
    }
}

/// Periodically restores the overlay z-index against host drift. Runs until
/// the future is dropped.
pub async fn run_z_order_poll(orchestrator: Arc<Orchestrator>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        orchestrator.overlay().lock().await.ensure_z_order();
    }
}
