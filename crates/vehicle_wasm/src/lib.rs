//! WebAssembly bindings for `vehicle_core`.
//!
//! Parameter documents, initial conditions and manoeuvres cross the boundary
//! as plain JS objects and are decoded with `serde_wasm_bindgen`; states and
//! progress reports go back the same way.

mod runner;
mod setup;
mod vehicle;

pub use runner::WasmManoeuvreRunner;
pub use vehicle::WasmVehicle;

use wasm_bindgen::prelude::*;

/// Installs the panic hook and the browser-console tracing subscriber.
/// Safe to call more than once.
pub(crate) fn install_hooks() {
    console_error_panic_hook::set_once();
    // A subscriber is already installed after the first call.
    let _ = tracing_wasm::try_set_as_global_default();
}

pub(crate) fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

pub(crate) fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| js_error("Serialization error", e))
}
