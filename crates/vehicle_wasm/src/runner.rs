//! Stepped manoeuvre runner.

use crate::setup::{build_manoeuvre, build_simulation, ManoeuvreInput, RunResult};
use crate::vehicle::decode_initial;
use crate::{install_hooks, js_error, to_js};
use serde_wasm_bindgen::from_value;
use vehicle_core::{ManoeuvreRunner, VehicleConfig};
use wasm_bindgen::prelude::*;

/// WASM-exported runner that drives a vehicle through a manoeuvre.
/// Runs batches of ticks at a time so the host can report progress.
#[wasm_bindgen]
pub struct WasmManoeuvreRunner {
    runner: Option<ManoeuvreRunner>,
}

#[wasm_bindgen]
impl WasmManoeuvreRunner {
    /// `manoeuvre_val` is `{steering: [...], throttle: [...], brake: [...], time: [...]}`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_val: JsValue,
        frequency: f64,
        initial_val: JsValue,
        manoeuvre_val: JsValue,
    ) -> Result<WasmManoeuvreRunner, JsValue> {
        install_hooks();

        let config: VehicleConfig =
            from_value(config_val).map_err(|e| js_error("Invalid vehicle parameters", e))?;
        let initial = decode_initial(initial_val)?;
        let input: ManoeuvreInput =
            from_value(manoeuvre_val).map_err(|e| js_error("Invalid manoeuvre", e))?;
        let manoeuvre =
            build_manoeuvre(input).map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        let simulation = build_simulation(&config, frequency, &initial)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        Ok(WasmManoeuvreRunner {
            runner: Some(ManoeuvreRunner::new(simulation, manoeuvre)),
        })
    }

    pub fn is_done(&self) -> bool {
        self.runner.as_ref().map_or(true, |runner| runner.is_done())
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        let progress = runner.run_steps(batch_size as usize);
        to_js(&progress)
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        to_js(&runner.progress())
    }

    /// The padded output log. Fails until the run is done.
    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        let outcome = runner
            .outcome()
            .ok_or_else(|| JsValue::from_str("Manoeuvre run has not finished yet."))?;
        to_js(&RunResult::from(&outcome))
    }
}
