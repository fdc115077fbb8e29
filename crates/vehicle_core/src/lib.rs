//! The `vehicle_core` crate simulates the longitudinal, lateral and vertical
//! dynamics of a four-wheeled vehicle with an explicit-Euler tick loop.
//!
//! Key components:
//! - **Parameters**: `VehicleConfig` (serde parameter document) validated into
//!   the immutable `StaticParameters`.
//! - **State**: `CurrentState`, the single mutable state threaded through every stage.
//! - **Stages**: `Powertrain` (gears, engine, torque converter, brakes),
//!   `Wheels` (slip, Magic-Formula tire forces, wheel spin) and `Body`
//!   (suspension, wheel loads, chassis motion), run in that order each tick.
//! - **Driver**: `Simulation::tick`, plus `ManoeuvreRunner` for batched runs
//!   over a `Manoeuvre` that produce a fixed-length `OutputStates` log.
//!
//! Wheel-indexed quantities always use the order FL, RL, FR, RR.

pub mod body;
pub mod error;
pub mod interpolation;
pub mod manoeuvre;
pub mod output;
pub mod parameters;
pub mod powertrain;
pub mod simulation;
pub mod state;
pub mod traits;
pub mod wheels;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::{ConfigError, SimulationError};
pub use manoeuvre::{DriverInput, Manoeuvre};
pub use output::OutputStates;
pub use parameters::{StaticParameters, VehicleConfig};
pub use simulation::{ManoeuvreRunner, RunOutcome, RunProgress, Simulation, TickFailure};
pub use state::{ChassisState, CurrentState};
pub use traits::{FlatRoad, RoadProfile};
