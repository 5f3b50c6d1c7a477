//! The marker registry: sole owner of the `id → handle` association.
//!
//! Handles are opaque tokens from the map layer. The registry creates them for
//! new ids, releases them for ids that disappear, and leaves surviving ids
//! alone so a marker present in two consecutive results keeps its handle.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{HazardMarker, LatLng, MarkerId};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("map layer rejected marker at {position}: {reason}")]
pub struct HandleCreationError {
    pub position: LatLng,
    pub reason: String,
}

/// Marker capability of the map SDK.
pub trait MarkerLayer {
    type Handle: Clone;

    fn create_handle(&mut self, position: LatLng) -> Result<Self::Handle, HandleCreationError>;
    fn destroy_handle(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: Vec<MarkerId>,
    pub removed: Vec<MarkerId>,
    pub kept: usize,
    pub failed: Vec<(MarkerId, HandleCreationError)>,
}

impl ReconcileReport {
    /// Whether the handle set changed. Failed creations alone do not count.
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

#[derive(Debug)]
pub struct MarkerRegistry<H> {
    markers: BTreeMap<MarkerId, H>,
}

impl<H> Default for MarkerRegistry<H> {
    fn default() -> Self {
        MarkerRegistry {
            markers: BTreeMap::new(),
        }
    }
}

impl<H: Clone> MarkerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.markers.contains_key(id)
    }

    pub fn get(&self, id: &MarkerId) -> Option<&H> {
        self.markers.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &MarkerId> {
        self.markers.keys()
    }

    /// All handles, ordered by marker id.
    pub fn handles(&self) -> Vec<H> {
        self.markers.values().cloned().collect()
    }

    /// Bring the registry in line with `new_set`.
    ///
    /// If an id appears more than once in `new_set`, the first occurrence wins.
    pub fn reconcile<L>(&mut self, layer: &mut L, new_set: &[HazardMarker]) -> ReconcileReport
    where
        L: MarkerLayer<Handle = H>,
    {
        let mut incoming: BTreeMap<&MarkerId, &HazardMarker> = BTreeMap::new();
        for marker in new_set {
            incoming.entry(&marker.id).or_insert(marker);
        }

        let mut report = ReconcileReport::default();

        let stale: Vec<MarkerId> = self
            .markers
            .keys()
            .filter(|id| !incoming.contains_key(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(handle) = self.markers.remove(&id) {
                layer.destroy_handle(handle);
            }
            report.removed.push(id);
        }

        for (id, marker) in incoming {
            if self.markers.contains_key(id) {
                report.kept += 1;
                continue;
            }
            match layer.create_handle(marker.position) {
                Ok(handle) => {
                    self.markers.insert(id.clone(), handle);
                    report.added.push(id.clone());
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping marker");
                    report.failed.push((id.clone(), e));
                }
            }
        }

        report
    }

    /// Release every handle. Returns how many were released.
    pub fn clear<L>(&mut self, layer: &mut L) -> usize
    where
        L: MarkerLayer<Handle = H>,
    {
        let count = self.markers.len();
        for (_, handle) in std::mem::take(&mut self.markers) {
            layer.destroy_handle(handle);
        }
        count
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::BTreeSet;

    /// In-memory map layer that tracks live handles.
    #[derive(Debug, Default)]
    pub struct FakeLayer {
        next: u32,
        pub live: BTreeSet<u32>,
        pub created: Vec<u32>,
        pub destroyed: Vec<u32>,
    }

    impl MarkerLayer for FakeLayer {
        type Handle = u32;

        fn create_handle(&mut self, position: LatLng) -> Result<u32, HandleCreationError> {
            if !position.is_valid() {
                return Err(HandleCreationError {
                    position,
                    reason: "invalid position".to_string(),
                });
            }
            self.next += 1;
            self.live.insert(self.next);
            self.created.push(self.next);
            Ok(self.next)
        }

        fn destroy_handle(&mut self, handle: u32) {
            assert!(self.live.remove(&handle), "handle {} destroyed twice", handle);
            self.destroyed.push(handle);
        }
    }
}
