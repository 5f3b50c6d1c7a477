use dioxus::prelude::*;

#[component]
pub fn Header(on_locate: EventHandler<()>) -> Element {
    rsx! {
        header { class: "app-header",
            h1 { "Asphalt Alert" }
            button {
                class: "locate",
                title: "Center the map on my position",
                onclick: move |_| on_locate.call(()),
                "Locate me"
            }
        }
    }
}
