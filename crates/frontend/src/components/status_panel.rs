use asphalt_shared::sync::SyncOutcome;
use dioxus::prelude::*;

/// What the status bar shows about the marker sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapStatus {
    pub markers: usize,
    pub refreshes: u64,
    pub error: Option<String>,
}

impl MapStatus {
    /// Fold a sync outcome in. Stale and post-teardown responses change nothing.
    pub fn apply(&mut self, outcome: &SyncOutcome, markers: usize) {
        match outcome {
            SyncOutcome::Reconciled(_) => {
                self.markers = markers;
                self.refreshes += 1;
                self.error = None;
            }
            SyncOutcome::Failed(e) => {
                self.error = Some(format!("Could not load hazards: {}", e));
            }
            SyncOutcome::Stale { .. } | SyncOutcome::Disposed => {}
        }
    }

    pub fn summary(&self) -> String {
        match (self.refreshes, self.markers) {
            (0, _) => "Loading hazards...".to_string(),
            (_, 0) => "No hazards in view".to_string(),
            (_, 1) => "1 hazard in view".to_string(),
            (_, n) => format!("{} hazards in view", n),
        }
    }
}

#[component]
pub fn StatusPanel(status: MapStatus) -> Element {
    rsx! {
        div { class: "status-panel",
            span { class: "marker-count", "{status.summary()}" }
            if let Some(err) = &status.error {
                span { class: "status-error", "{err}" }
            }
        }
    }
}
