//! Synchronization orchestrator: round lifecycle, fan-out across visible
//! partitions, and the atomic overlay commit.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;

use futures::future::join_all;
use roadlens_protocol::RoadVector;
use roadlens_protocol::Settings;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::host::MapHost;
use crate::overlay::Overlay;
use crate::overlay::StatusIndicator;
use crate::planner::FetchContext;
use crate::planner::fetch_layer;
use crate::query::SpatialQueryClient;
use crate::registry::PartitionRegistry;

/// No fetch at or below this zoom; the extent would cover far too much
/// ground for a feature query.
pub const MIN_ZOOM_LEVEL: u32 = 14;

/// Status line shown when every partition in a round failed.
pub const LOAD_ERROR_TEXT: &str = "Road types failed to load";

/// One end-to-end synchronization attempt. At most one round is current;
/// starting a new round supersedes the previous one, whose in-flight work
/// then discards itself at the next checkpoint.
pub struct SyncRound {
    seq: u64,
    cancel: CancellationToken,
    started_at: Instant,
    completed_requests: AtomicUsize,
}

impl SyncRound {
    pub fn new(seq: u64) -> Self {
        Self {
            seq,
            cancel: CancellationToken::new(),
            started_at: Instant::now(),
            completed_requests: AtomicUsize::new(0),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Flag this round as superseded. Cooperative: in-flight requests are
    /// not aborted, their results are discarded at the checkpoints.
    pub fn supersede(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn record_completed_request(&self) {
        self.completed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed_requests(&self) -> usize {
        self.completed_requests.load(Ordering::Relaxed)
    }
}

/// Top-level controller. Owns the registry, the query client, the current
/// round, and the only write path into the overlay. Constructed once at
/// startup; collaborators receive handles.
pub struct Orchestrator {
    registry: PartitionRegistry,
    client: SpatialQueryClient,
    host: Arc<dyn MapHost>,
    overlay: Arc<Mutex<Overlay>>,
    status: Arc<StatusIndicator>,
    settings: Arc<Mutex<Settings>>,
    current_round: Mutex<Option<Arc<SyncRound>>>,
    next_seq: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        registry: PartitionRegistry,
        client: SpatialQueryClient,
        host: Arc<dyn MapHost>,
        settings: Settings,
    ) -> Self {
        let overlay = Overlay::new(settings.layer_visible);
        Self {
            registry,
            client,
            host,
            overlay: Arc::new(Mutex::new(overlay)),
            status: Arc::new(StatusIndicator::default()),
            settings: Arc::new(Mutex::new(settings)),
            current_round: Mutex::new(None),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn overlay(&self) -> Arc<Mutex<Overlay>> {
        self.overlay.clone()
    }

    pub fn status(&self) -> Arc<StatusIndicator> {
        self.status.clone()
    }

    pub fn settings(&self) -> Arc<Mutex<Settings>> {
        self.settings.clone()
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    pub fn host(&self) -> Arc<dyn MapHost> {
        self.host.clone()
    }

    /// Runs one synchronization round for the current viewport.
    ///
    /// No-op while the overlay is hidden. At or below [`MIN_ZOOM_LEVEL`] the
    /// overlay is cleared and nothing is fetched. Otherwise the previous
    /// round is superseded, one fetch context is fanned out per visible
    /// partition/layer pair, and the collected vectors replace the overlay
    /// contents in one pass, provided this round was not itself superseded
    /// in the meantime.
    pub async fn trigger_sync(&self) {
        if !self.overlay.lock().await.is_visible() {
            debug!("overlay hidden; skipping sync");
            return;
        }

        let zoom = self.host.zoom();
        if zoom <= MIN_ZOOM_LEVEL {
            debug!(zoom, "below minimum zoom; clearing overlay");
            // An in-flight round from a deeper zoom must not repopulate
            // the overlay after this clear.
            self.supersede_current().await;
            self.overlay.lock().await.clear();
            return;
        }

        let settings = self.settings.lock().await.clone();
        let round = self.begin_round().await;
        // Exactly one decrement per round, on every exit path.
        let _loading = self.status.loading_guard();

        let partitions = self
            .registry
            .visible_partitions(settings.active_state_abbr.as_deref(), self.host.editor_rank());
        let envelope = self.host.extent();

        let contexts: Vec<FetchContext<'_>> = partitions
            .iter()
            .flat_map(|&partition| {
                partition.layers.iter().map(|layer| FetchContext {
                    round: round.clone(),
                    partition,
                    layer,
                    envelope,
                    zoom,
                    highlight_streets: settings.road_type_enabled,
                })
            })
            .collect();

        let fetches = contexts.iter().map(|ctx| async move {
            let result = fetch_layer(&self.client, ctx).await;
            (ctx.partition.code, result)
        });
        let results = join_all(fetches).await;

        let mut vectors: Vec<RoadVector> = Vec::new();
        let mut succeeded: HashSet<&str> = HashSet::new();
        let mut failed: HashSet<&str> = HashSet::new();
        for (code, result) in results {
            match result {
                Ok(mut layer_vectors) => {
                    succeeded.insert(code);
                    vectors.append(&mut layer_vectors);
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    // Contributes nothing; siblings are unaffected.
                    error!(partition = code, error = %err, "partition fetch failed");
                    failed.insert(code);
                }
            }
        }

        let total_failure = succeeded.is_empty() && !failed.is_empty();
        let vector_count = vectors.len();

        // Commit checkpoint, taken under the overlay lock so a supersede
        // cannot slip in between the check and the swap.
        {
            let mut overlay = self.overlay.lock().await;
            if round.is_cancelled() {
                debug!(seq = round.seq(), "round superseded; discarding results");
                return;
            }
            overlay.replace(vectors);
        }

        if total_failure {
            self.status.set_error(LOAD_ERROR_TEXT);
        }
        info!(
            seq = round.seq(),
            vectors = vector_count,
            requests = round.completed_requests(),
            elapsed_ms = round.started_at().elapsed().as_millis() as u64,
            partitions_failed = failed.len(),
            "sync round committed"
        );
    }

    /// Supersedes and drops the current round without starting a new one.
    async fn supersede_current(&self) {
        if let Some(previous) = self.current_round.lock().await.take() {
            debug!(superseded = previous.seq(), "superseding in-flight round");
            previous.supersede();
        }
    }

    /// Creates the next round and supersedes the previous one, if any.
    async fn begin_round(&self) -> Arc<SyncRound> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let round = Arc::new(SyncRound::new(seq));
        let mut current = self.current_round.lock().await;
        if let Some(previous) = current.replace(round.clone()) {
            debug!(
                superseded = previous.seq(),
                next = seq,
                "superseding in-flight round"
            );
            previous.supersede();
        }
        round
    }
}
