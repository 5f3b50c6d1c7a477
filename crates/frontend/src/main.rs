mod api;
mod components;
mod geolocation;
mod leaflet;
mod pages;
mod scheduler;

use dioxus::prelude::*;

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        pages::hazard_map::HazardMap {}
    }
}

fn main() {
    launch(App);
}
