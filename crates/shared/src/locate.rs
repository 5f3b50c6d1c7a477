use crate::models::LatLng;

/// Viewport control of the map SDK.
pub trait MapViewport {
    fn pan_to(&mut self, position: LatLng);
}

/// Recenters the map on device position updates.
///
/// It never fetches anything: the pan changes the viewport, and the map's own
/// bounds-changed event drives the normal debounce/fetch path.
#[derive(Debug, Default)]
pub struct SelfLocatePanner {
    last: Option<LatLng>,
    recenters: u64,
}

impl SelfLocatePanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_position(&self) -> Option<LatLng> {
        self.last
    }

    pub fn recenters(&self) -> u64 {
        self.recenters
    }

    /// Pan once to `position`. Invalid positions are ignored.
    pub fn on_position_available<V: MapViewport + ?Sized>(
        &mut self,
        position: LatLng,
        viewport: &mut V,
    ) -> bool {
        if !position.is_valid() {
            tracing::warn!(%position, "ignoring invalid device position");
            return false;
        }
        viewport.pan_to(position);
        self.last = Some(position);
        self.recenters += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingViewport {
        pans: Vec<LatLng>,
    }

    impl MapViewport for RecordingViewport {
        fn pan_to(&mut self, position: LatLng) {
            self.pans.push(position);
        }
    }

    #[test]
    fn test_pans_once_per_update() {
        let mut panner = SelfLocatePanner::new();
        let mut viewport = RecordingViewport::default();
        let here = LatLng::new(42.684928, 23.316489);

        assert!(panner.on_position_available(here, &mut viewport));
        assert!(panner.on_position_available(here, &mut viewport));

        assert_eq!(viewport.pans, vec![here, here]);
        assert_eq!(panner.recenters(), 2);
        assert_eq!(panner.last_position(), Some(here));
    }

    #[test]
    fn test_invalid_position_ignored() {
        let mut panner = SelfLocatePanner::new();
        let mut viewport = RecordingViewport::default();
        assert!(!panner.on_position_available(LatLng::new(f64::NAN, 0.0), &mut viewport));
        assert!(viewport.pans.is_empty());
        assert!(panner.last_position().is_none());
    }
}
