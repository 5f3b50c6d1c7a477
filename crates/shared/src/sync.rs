//! Viewport-synchronized marker state for one map view.
//!
//! [`MapSync`] is a plain state machine. The host feeds it events (bounds
//! changed, timer fired, fetch finished, position available) one at a time and
//! performs the I/O it asks for. Nothing here blocks or spawns.
//!
//! ```text
//! bounds changed ─▶ DebounceGate ─▶ FetchTicket ─▶ (host fetches) ─▶ FetchCompletion
//!                                                                        │
//!             clusterer ◀─ ClusterSync ◀─ MarkerRegistry ◀─ Normalizer ◀─┘
//! ```
use std::time::Duration;

use crate::bounds::ViewportBounds;
use crate::cluster::{ClusterSync, Clusterer};
use crate::debounce::{DebounceGate, Scheduler, TimerToken, DEFAULT_QUIET_INTERVAL};
use crate::fetch::{FetchCompletion, FetchError, FetchGeneration, FetchTicket, GenerationTracker};
use crate::locate::{MapViewport, SelfLocatePanner};
use crate::models::LatLng;
use crate::normalize::{Normalizer, DEFAULT_ID_PRECISION};
use crate::registry::{MarkerLayer, MarkerRegistry, ReconcileReport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    pub quiet_interval: Duration,
    pub id_precision: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            quiet_interval: DEFAULT_QUIET_INTERVAL,
            id_precision: DEFAULT_ID_PRECISION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The response was current and has been reconciled. The clusterer was
    /// updated iff `report.changed()`.
    Reconciled(ReconcileReport),
    /// A newer fetch was issued after this one.
    Stale {
        generation: FetchGeneration,
        latest: Option<FetchGeneration>,
    },
    /// The fetch failed; markers are unchanged.
    Failed(FetchError),
    /// The view was torn down before the response arrived.
    Disposed,
}

pub struct MapSync<L: MarkerLayer, C> {
    gate: DebounceGate,
    generations: GenerationTracker,
    normalizer: Normalizer,
    registry: MarkerRegistry<L::Handle>,
    cluster_sync: ClusterSync,
    panner: SelfLocatePanner,
    layer: L,
    clusterer: C,
    disposed: bool,
}

impl<L, C> MapSync<L, C>
where
    L: MarkerLayer,
    C: Clusterer<Handle = L::Handle>,
{
    pub fn new(config: SyncConfig, layer: L, clusterer: C) -> Self {
        MapSync {
            gate: DebounceGate::new(config.quiet_interval),
            generations: GenerationTracker::new(),
            normalizer: Normalizer::new(config.id_precision),
            registry: MarkerRegistry::new(),
            cluster_sync: ClusterSync::new(),
            panner: SelfLocatePanner::new(),
            layer,
            clusterer,
            disposed: false,
        }
    }

    pub fn registry(&self) -> &MarkerRegistry<L::Handle> {
        &self.registry
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn clusterer(&self) -> &C {
        &self.clusterer
    }

    pub fn cluster_pushes(&self) -> u64 {
        self.cluster_sync.pushes()
    }

    pub fn latest_generation(&self) -> Option<FetchGeneration> {
        self.generations.latest()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Viewport observer entry point. Manual pans and self-locate pans both
    /// arrive here.
    pub fn on_bounds_changed<S: Scheduler + ?Sized>(
        &mut self,
        bounds: ViewportBounds,
        scheduler: &mut S,
    ) {
        if self.disposed {
            return;
        }
        self.gate.on_bounds_changed(bounds, scheduler);
    }

    /// Timer callback. Returns the query to issue when the viewport settled.
    pub fn on_timer(&mut self, token: TimerToken) -> Option<FetchTicket> {
        if self.disposed {
            return None;
        }
        let bounds = self.gate.on_timer(token)?;
        let generation = self.generations.issue();
        tracing::debug!(%generation, %bounds, "viewport settled");
        Some(FetchTicket { generation, bounds })
    }

    pub fn on_fetch_complete(&mut self, completion: FetchCompletion) -> SyncOutcome {
        let FetchCompletion { generation, result } = completion;

        if self.disposed {
            return SyncOutcome::Disposed;
        }
        if !self.generations.is_current(generation) {
            let latest = self.generations.latest();
            tracing::debug!(%generation, ?latest, "discarding stale hazard response");
            return SyncOutcome::Stale { generation, latest };
        }

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(%generation, error = %e, "hazard fetch failed, keeping markers");
                return SyncOutcome::Failed(e);
            }
        };

        let markers = self.normalizer.normalize(&records);
        let report = self.registry.reconcile(&mut self.layer, &markers);
        if report.changed() {
            self.cluster_sync.push(&self.registry, &mut self.clusterer);
        }
        tracing::info!(
            %generation,
            added = report.added.len(),
            removed = report.removed.len(),
            kept = report.kept,
            failed = report.failed.len(),
            "reconciled hazard markers"
        );
        SyncOutcome::Reconciled(report)
    }

    pub fn on_position_available<V: MapViewport + ?Sized>(
        &mut self,
        position: LatLng,
        viewport: &mut V,
    ) -> bool {
        if self.disposed {
            return false;
        }
        self.panner.on_position_available(position, viewport)
    }

    /// Cancel the pending settle, release every handle and empty the clusterer.
    /// Later events are ignored.
    pub fn teardown<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.disposed {
            return;
        }
        self.gate.cancel(scheduler);
        let released = self.registry.clear(&mut self.layer);
        self.cluster_sync.clear(&mut self.clusterer);
        self.disposed = true;
        tracing::debug!(released, "map sync torn down");
    }
}
