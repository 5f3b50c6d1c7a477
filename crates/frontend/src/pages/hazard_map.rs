use std::cell::RefCell;
use std::rc::Rc;

use asphalt_shared::bounds::ViewportBounds;
use asphalt_shared::debounce::TimerToken;
use asphalt_shared::fetch::FetchCompletion;
use asphalt_shared::models::LatLng;
use asphalt_shared::sync::{MapSync, SyncConfig};
use dioxus::prelude::*;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::api::{self, HttpHazardSource};
use crate::components::header::Header;
use crate::components::status_panel::{MapStatus, StatusPanel};
use crate::geolocation;
use crate::leaflet::{self, LeafletClusterer, LeafletLayer, LeafletViewport};
use crate::scheduler::BrowserScheduler;

const MAP_ELEMENT_ID: &str = "hazard-map";

/// Where the map opens before a position fix arrives (Sofia).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 42.684928,
    lng: 23.316489,
};
pub const DEFAULT_ZOOM: f64 = 17.0;

/// Everything that can happen to a mounted map, serialized through one channel
/// so the sync state is only ever touched by the event loop.
enum MapEvent {
    BoundsChanged(ViewportBounds),
    TimerFired(TimerToken),
    FetchDone(FetchCompletion),
    Position(LatLng),
}

/// A live Leaflet map and the sync state driving its markers.
struct Session {
    map: leaflet::Map,
    sync: MapSync<LeafletLayer, LeafletClusterer>,
    scheduler: BrowserScheduler,
    viewport: LeafletViewport,
    source: HttpHazardSource,
    on_moveend: Closure<dyn FnMut()>,
}

impl Session {
    fn start(events: UnboundedSender<MapEvent>) -> Result<Self, String> {
        let base = api::api_base().ok_or("page origin is unavailable")?;
        let (map, group) = leaflet::mount(MAP_ELEMENT_ID, DEFAULT_CENTER, DEFAULT_ZOOM)?;

        let on_moveend = {
            let map = map.clone();
            let events = events.clone();
            Closure::<dyn FnMut()>::new(move || match leaflet::current_bounds(&map) {
                Ok(bounds) => {
                    let _ = events.unbounded_send(MapEvent::BoundsChanged(bounds));
                }
                Err(e) => tracing::warn!(error = %e, "ignoring unusable map bounds"),
            })
        };
        map.on("moveend", on_moveend.as_ref().unchecked_ref());

        let scheduler = BrowserScheduler::new(move |token| {
            let _ = events.unbounded_send(MapEvent::TimerFired(token));
        });
        let sync = MapSync::new(
            SyncConfig::default(),
            LeafletLayer::new(group.clone()),
            LeafletClusterer::new(group),
        );

        Ok(Session {
            viewport: LeafletViewport::new(map.clone()),
            map,
            sync,
            scheduler,
            source: HttpHazardSource::new(base),
            on_moveend,
        })
    }

    fn close(mut self) {
        self.sync.teardown(&mut self.scheduler);
        self.map
            .off("moveend", self.on_moveend.as_ref().unchecked_ref());
        self.map.remove();
    }
}

fn locate(events: UnboundedSender<MapEvent>) {
    geolocation::request_position(move |fix| {
        let _ = events.unbounded_send(MapEvent::Position(fix));
    });
}

fn handle_event(
    session: &RefCell<Option<Session>>,
    events: &UnboundedSender<MapEvent>,
    event: MapEvent,
    status: &mut Signal<MapStatus>,
) {
    let mut guard = session.borrow_mut();
    let Some(s) = guard.as_mut() else {
        return;
    };

    match event {
        MapEvent::BoundsChanged(bounds) => s.sync.on_bounds_changed(bounds, &mut s.scheduler),
        MapEvent::TimerFired(token) => {
            if let Some(ticket) = s.sync.on_timer(token) {
                let source = s.source.clone();
                let events = events.clone();
                spawn(async move {
                    let completion = ticket.execute(&source).await;
                    let _ = events.unbounded_send(MapEvent::FetchDone(completion));
                });
            }
        }
        MapEvent::FetchDone(completion) => {
            let outcome = s.sync.on_fetch_complete(completion);
            let markers = s.sync.registry().len();
            status.with_mut(|st| st.apply(&outcome, markers));
        }
        MapEvent::Position(position) => {
            s.sync.on_position_available(position, &mut s.viewport);
        }
    }
}

#[component]
pub fn HazardMap() -> Element {
    let mut status = use_signal(MapStatus::default);
    let session = use_hook(|| Rc::new(RefCell::new(None::<Session>)));
    let (events, inbox) = use_hook(|| {
        let (tx, rx) = mpsc::unbounded::<MapEvent>();
        (tx, Rc::new(RefCell::new(Some(rx))))
    });

    // Event loop
    {
        let session = session.clone();
        let events = events.clone();
        use_future(move || {
            let session = session.clone();
            let events = events.clone();
            let inbox = inbox.borrow_mut().take();
            async move {
                let Some(mut inbox) = inbox else {
                    return;
                };
                while let Some(event) = inbox.next().await {
                    handle_event(&session, &events, event, &mut status);
                }
            }
        });
    }

    // Detach everything when the view goes away; in-flight fetches land on a
    // disposed sync and are dropped.
    {
        let session = session.clone();
        use_drop(move || {
            if let Some(s) = session.borrow_mut().take() {
                s.close();
            }
        });
    }

    let on_mounted = {
        let session = session.clone();
        let events = events.clone();
        move |_: Event<MountedData>| {
            if session.borrow().is_some() {
                return;
            }
            match Session::start(events.clone()) {
                Ok(started) => {
                    // Leaflet only reports moves after the listener exists, so
                    // seed the first query by hand.
                    match leaflet::current_bounds(&started.map) {
                        Ok(bounds) => {
                            let _ = events.unbounded_send(MapEvent::BoundsChanged(bounds));
                        }
                        Err(e) => tracing::warn!(error = %e, "initial map bounds unusable"),
                    }
                    *session.borrow_mut() = Some(started);
                    locate(events.clone());
                }
                Err(e) => {
                    tracing::error!(error = %e, "map failed to start");
                    status.with_mut(|st| st.error = Some(e));
                }
            }
        }
    };

    let on_locate = move |_: ()| locate(events.clone());

    rsx! {
        div { class: "app",
            Header { on_locate: on_locate }
            div { id: MAP_ELEMENT_ID, class: "map", onmounted: on_mounted }
            StatusPanel { status: status.read().clone() }
        }
    }
}
