use crate::registry::MarkerRegistry;

/// Clustering layer of the map SDK. It only understands whole-set replacement.
pub trait Clusterer {
    type Handle;

    fn set_handles(&mut self, handles: Vec<Self::Handle>);
}

/// Pushes the registry's full handle set to the clusterer.
#[derive(Debug, Default)]
pub struct ClusterSync {
    pushes: u64,
}

impl ClusterSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pushes so far, including clears.
    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    pub fn push<H, C>(&mut self, registry: &MarkerRegistry<H>, clusterer: &mut C)
    where
        H: Clone,
        C: Clusterer<Handle = H>,
    {
        let handles = registry.handles();
        tracing::debug!(count = handles.len(), "pushing markers to clusterer");
        clusterer.set_handles(handles);
        self.pushes += 1;
    }

    pub fn clear<C: Clusterer>(&mut self, clusterer: &mut C) {
        clusterer.set_handles(Vec::new());
        self.pushes += 1;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Default)]
    pub struct FakeClusterer {
        pub current: Vec<u32>,
        pub calls: usize,
    }

    impl Clusterer for FakeClusterer {
        type Handle = u32;

        fn set_handles(&mut self, handles: Vec<u32>) {
            self.current = handles;
            self.calls += 1;
        }
    }
}
