//! Leaflet + Leaflet.markercluster bindings and the map-layer adapters built
//! on them. The scripts are loaded from `Dioxus.toml`.
use asphalt_shared::bounds::ViewportBounds;
use asphalt_shared::cluster::Clusterer;
use asphalt_shared::locate::MapViewport;
use asphalt_shared::models::LatLng;
use asphalt_shared::registry::{HandleCreationError, MarkerLayer};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[derive(Debug, Clone)]
    pub type Map;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    fn new_map(element_id: &str) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &Map, center: &JsValue, zoom: f64) -> Map;

    #[wasm_bindgen(method, js_name = getBounds)]
    fn get_bounds(this: &Map) -> LatLngBounds;

    #[wasm_bindgen(method, js_name = panTo)]
    fn pan_to(this: &Map, center: &JsValue) -> Map;

    #[wasm_bindgen(method)]
    pub fn on(this: &Map, event: &str, handler: &js_sys::Function) -> Map;

    #[wasm_bindgen(method)]
    pub fn off(this: &Map, event: &str, handler: &js_sys::Function) -> Map;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Map) -> Map;

    #[wasm_bindgen(method, js_name = addLayer)]
    fn add_layer(this: &Map, layer: &JsValue) -> Map;

    #[derive(Debug, Clone)]
    type LatLngBounds;

    #[wasm_bindgen(method, js_name = getNorth)]
    fn get_north(this: &LatLngBounds) -> f64;
    #[wasm_bindgen(method, js_name = getSouth)]
    fn get_south(this: &LatLngBounds) -> f64;
    #[wasm_bindgen(method, js_name = getEast)]
    fn get_east(this: &LatLngBounds) -> f64;
    #[wasm_bindgen(method, js_name = getWest)]
    fn get_west(this: &LatLngBounds) -> f64;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    fn tile_layer(url_template: &str, options: &JsValue) -> JsValue;

    #[derive(Debug, Clone)]
    pub type Marker;

    #[wasm_bindgen(catch, js_namespace = L, js_name = marker)]
    fn new_marker(position: &JsValue) -> Result<Marker, JsValue>;

    #[derive(Debug, Clone)]
    pub type MarkerClusterGroup;

    #[wasm_bindgen(js_namespace = L, js_name = markerClusterGroup)]
    fn new_marker_cluster_group() -> MarkerClusterGroup;

    #[wasm_bindgen(method, js_name = clearLayers)]
    fn clear_layers(this: &MarkerClusterGroup);

    #[wasm_bindgen(method, js_name = addLayers)]
    fn add_layers(this: &MarkerClusterGroup, layers: &js_sys::Array);

    #[wasm_bindgen(method, js_name = removeLayer)]
    fn remove_layer(this: &MarkerClusterGroup, layer: &Marker);
}

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

fn js_lat_lng(position: LatLng) -> JsValue {
    js_sys::Array::of2(&position.lat.into(), &position.lng.into()).into()
}

/// Create the map inside the element with `element_id`, centered on `center`,
/// with OSM tiles and an attached cluster group.
pub fn mount(
    element_id: &str,
    center: LatLng,
    zoom: f64,
) -> Result<(Map, MarkerClusterGroup), String> {
    let map = new_map(element_id).map_err(|e| format!("Leaflet failed to start: {:?}", e))?;
    map.set_view(&js_lat_lng(center), zoom);

    let options = js_sys::Object::new();
    js_sys::Reflect::set(
        &options,
        &"attribution".into(),
        &TILE_ATTRIBUTION.into(),
    )
    .map_err(|e| format!("{:?}", e))?;
    map.add_layer(&tile_layer(TILE_URL, &options));

    let group = new_marker_cluster_group();
    map.add_layer(&group);
    Ok((map, group))
}

/// The map's visible rectangle. Leaflet reports continuous longitudes once
/// the world has been panned around, so they are wrapped here.
pub fn current_bounds(map: &Map) -> Result<ViewportBounds, String> {
    let b = map.get_bounds();
    ViewportBounds::from_unwrapped(b.get_north(), b.get_south(), b.get_east(), b.get_west())
        .map_err(|e| e.to_string())
}

/// Plain Leaflet markers. Handles live in the cluster group, so destroying one
/// means taking it back out of the group.
pub struct LeafletLayer {
    group: MarkerClusterGroup,
}

impl LeafletLayer {
    pub fn new(group: MarkerClusterGroup) -> Self {
        LeafletLayer { group }
    }
}

impl MarkerLayer for LeafletLayer {
    type Handle = Marker;

    fn create_handle(&mut self, position: LatLng) -> Result<Marker, HandleCreationError> {
        if !position.is_valid() {
            return Err(HandleCreationError {
                position,
                reason: "coordinates out of range".to_string(),
            });
        }
        new_marker(&js_lat_lng(position)).map_err(|e| HandleCreationError {
            position,
            reason: format!("{:?}", e),
        })
    }

    fn destroy_handle(&mut self, handle: Marker) {
        self.group.remove_layer(&handle);
    }
}

pub struct LeafletClusterer {
    group: MarkerClusterGroup,
}

impl LeafletClusterer {
    pub fn new(group: MarkerClusterGroup) -> Self {
        LeafletClusterer { group }
    }
}

impl Clusterer for LeafletClusterer {
    type Handle = Marker;

    fn set_handles(&mut self, handles: Vec<Marker>) {
        self.group.clear_layers();
        if !handles.is_empty() {
            let layers: js_sys::Array = handles.iter().collect();
            self.group.add_layers(&layers);
        }
    }
}

pub struct LeafletViewport {
    map: Map,
}

impl LeafletViewport {
    pub fn new(map: Map) -> Self {
        LeafletViewport { map }
    }
}

impl MapViewport for LeafletViewport {
    fn pan_to(&mut self, position: LatLng) {
        self.map.pan_to(&js_lat_lng(position));
    }
}
