use asphalt_shared::models::LatLng;
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

fn number_at(value: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(value, &JsValue::from_str(key)).ok()?.as_f64()
}

/// `GeolocationPosition.coords` as a [`LatLng`].
fn position_from_js(position: &JsValue) -> Option<LatLng> {
    let coords = Reflect::get(position, &JsValue::from_str("coords")).ok()?;
    Some(LatLng::new(
        number_at(&coords, "latitude")?,
        number_at(&coords, "longitude")?,
    ))
}

/// Ask the browser for one position fix. `on_fix` runs at most once; denial,
/// timeouts and a missing geolocation API are logged and otherwise ignored.
pub fn request_position(on_fix: impl FnOnce(LatLng) + 'static) {
    let Some(geolocation) = web_sys::window().and_then(|w| w.navigator().geolocation().ok())
    else {
        tracing::warn!("geolocation is not available");
        return;
    };

    let success = Closure::once_into_js(move |position: JsValue| {
        match position_from_js(&position) {
            Some(fix) => on_fix(fix),
            None => tracing::warn!("geolocation returned a position without coordinates"),
        }
    });
    let failure = Closure::once_into_js(|error: JsValue| {
        let message = Reflect::get(&error, &JsValue::from_str("message"))
            .ok()
            .and_then(|m| m.as_string())
            .unwrap_or_default();
        tracing::warn!(%message, "geolocation request failed");
    });

    if let Err(e) = geolocation.get_current_position_with_error_callback(
        success.unchecked_ref(),
        Some(failure.unchecked_ref()),
    ) {
        tracing::warn!(error = ?e, "could not request a position");
    }
}
