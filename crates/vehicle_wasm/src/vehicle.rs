//! Tick-by-tick vehicle handle for interactive hosts.

use crate::setup::{build_simulation, InitialCondition};
use crate::{install_hooks, js_error, to_js};
use serde_wasm_bindgen::from_value;
use vehicle_core::{Simulation, VehicleConfig};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmVehicle {
    simulation: Simulation,
}

#[wasm_bindgen]
impl WasmVehicle {
    /// Builds a vehicle from a parameter object, a sample frequency (Hz) and
    /// an optional initial condition `{x, y, z, roll, pitch, yaw, vx, vy, vz, gear}`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_val: JsValue,
        frequency: f64,
        initial_val: JsValue,
    ) -> Result<WasmVehicle, JsValue> {
        install_hooks();

        let config: VehicleConfig =
            from_value(config_val).map_err(|e| js_error("Invalid vehicle parameters", e))?;
        let initial = decode_initial(initial_val)?;
        let simulation = build_simulation(&config, frequency, &initial)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        Ok(WasmVehicle { simulation })
    }

    /// Advances one time step and returns the new state.
    pub fn tick(&mut self, throttle: f64, brake: f64, steering: f64) -> Result<JsValue, JsValue> {
        let state = self
            .simulation
            .tick(throttle, brake, steering)
            .map_err(|e| js_error("Simulation failed", e))?;
        to_js(state)
    }

    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js(self.simulation.state())
    }

    pub fn ticks(&self) -> u32 {
        self.simulation.ticks() as u32
    }

    pub fn is_halted(&self) -> bool {
        self.simulation.is_halted()
    }
}

pub(crate) fn decode_initial(initial_val: JsValue) -> Result<InitialCondition, JsValue> {
    if initial_val.is_undefined() || initial_val.is_null() {
        return Ok(InitialCondition::default());
    }
    from_value(initial_val).map_err(|e| js_error("Invalid initial condition", e))
}
