//! Host-independent glue: decoding inputs into core types and shaping results.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use vehicle_core::{
    ChassisState, Manoeuvre, OutputStates, RunOutcome, Simulation, StaticParameters,
    VehicleConfig,
};

/// Initial pose, velocity and gear. Missing fields default to a vehicle at
/// rest at the origin in first gear.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InitialCondition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub gear: usize,
}

impl Default for InitialCondition {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            gear: 1,
        }
    }
}

impl InitialCondition {
    pub fn chassis(&self) -> ChassisState {
        ChassisState::default()
            .with_position(self.x, self.y, self.z)
            .with_attitude(self.roll, self.pitch, self.yaw)
            .with_velocity(self.vx, self.vy, self.vz)
    }
}

pub fn build_simulation(
    config: &VehicleConfig,
    frequency: f64,
    initial: &InitialCondition,
) -> Result<Simulation> {
    let params =
        StaticParameters::new(config, frequency).context("Invalid vehicle parameters")?;
    Simulation::new(params, initial.chassis(), initial.gear).context("Invalid initial condition")
}

/// Output log and failure reason in a serializable shape.
#[derive(Debug, Serialize)]
pub struct RunResult<'a> {
    pub states: &'a OutputStates,
    pub failed_at: Option<usize>,
    pub failure: Option<String>,
}

impl<'a> From<&'a RunOutcome> for RunResult<'a> {
    fn from(outcome: &'a RunOutcome) -> Self {
        Self {
            states: &outcome.outputs,
            failed_at: outcome.failure.as_ref().map(|failure| failure.tick),
            failure: outcome
                .failure
                .as_ref()
                .map(|failure| failure.error.to_string()),
        }
    }
}

/// Driver-input channels as sent by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct ManoeuvreInput {
    pub steering: Vec<f64>,
    pub throttle: Vec<f64>,
    pub brake: Vec<f64>,
    pub time: Vec<f64>,
}

pub fn build_manoeuvre(input: ManoeuvreInput) -> Result<Manoeuvre> {
    let manoeuvre = Manoeuvre::new(input.steering, input.throttle, input.brake, input.time)
        .context("Invalid manoeuvre")?;
    if manoeuvre.is_empty() {
        bail!("Manoeuvre has no samples.");
    }
    Ok(manoeuvre)
}
