//! Tick driver and manoeuvre runner.
//!
//! Each tick runs the powertrain, wheel and body stages in that order on one
//! exclusively borrowed [`CurrentState`]. The state is checked for
//! non-finite values at the end of every stage; the first failure halts the
//! simulation for good.

use crate::body::Body;
use crate::error::{ConfigError, SimulationError};
use crate::manoeuvre::Manoeuvre;
use crate::output::OutputStates;
use crate::parameters::StaticParameters;
use crate::powertrain::Powertrain;
use crate::state::{ChassisState, CurrentState};
use crate::traits::{FlatRoad, RoadProfile};
use crate::wheels::Wheels;
use serde::Serialize;
use std::sync::Arc;

/// The tick at which a run halted and why.
#[derive(Debug, Clone, PartialEq)]
pub struct TickFailure {
    pub tick: usize,
    pub error: SimulationError,
}

pub struct Simulation {
    params: Arc<StaticParameters>,
    powertrain: Powertrain,
    wheels: Wheels,
    body: Body,
    road: Box<dyn RoadProfile>,
    state: CurrentState,
    ticks: usize,
    failure: Option<TickFailure>,
}

impl Simulation {
    pub fn new(
        params: impl Into<Arc<StaticParameters>>,
        chassis: ChassisState,
        initial_gear: usize,
    ) -> Result<Self, ConfigError> {
        Self::with_road(params, chassis, initial_gear, FlatRoad)
    }

    pub fn with_road(
        params: impl Into<Arc<StaticParameters>>,
        chassis: ChassisState,
        initial_gear: usize,
        road: impl RoadProfile + 'static,
    ) -> Result<Self, ConfigError> {
        let params = params.into();
        let state = CurrentState::on_road(&params, chassis, initial_gear, &road)?;
        tracing::info!(
            frequency = params.frequency,
            gears = params.top_gear(),
            initial_gear,
            vx = chassis.vx,
            "simulation constructed"
        );

        Ok(Self {
            powertrain: Powertrain::new(Arc::clone(&params)),
            wheels: Wheels::new(Arc::clone(&params)),
            body: Body::new(Arc::clone(&params)),
            params,
            road: Box::new(road),
            state,
            ticks: 0,
            failure: None,
        })
    }

    pub fn params(&self) -> &StaticParameters {
        &self.params
    }

    pub fn state(&self) -> &CurrentState {
        &self.state
    }

    /// Number of successfully completed ticks.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn failure(&self) -> Option<&TickFailure> {
        self.failure.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.failure.is_some()
    }

    /// Advances the vehicle by one time step.
    ///
    /// After an error the state is left as it was when the failing stage
    /// stopped, and every later call returns [`SimulationError::Halted`].
    pub fn tick(
        &mut self,
        throttle: f64,
        brake: f64,
        steering: f64,
    ) -> Result<&CurrentState, SimulationError> {
        if self.failure.is_some() {
            return Err(SimulationError::Halted);
        }

        if let Err(error) = self.advance(throttle, brake, steering) {
            tracing::warn!(tick = self.ticks, %error, "simulation halted");
            self.failure = Some(TickFailure {
                tick: self.ticks,
                error: error.clone(),
            });
            return Err(error);
        }

        self.ticks += 1;
        Ok(&self.state)
    }

    fn advance(&mut self, throttle: f64, brake: f64, steering: f64) -> Result<(), SimulationError> {
        self.powertrain.tick(&mut self.state, throttle, brake)?;
        self.wheels.tick(&mut self.state, steering)?;
        self.body.tick(&mut self.state, self.road.as_ref())
    }

    /// Runs `manoeuvre` to completion or to the first failure.
    pub fn run(self, manoeuvre: &Manoeuvre) -> RunOutcome {
        ManoeuvreRunner::new(self, manoeuvre.clone()).into_outcome()
    }
}

/// Result of driving a simulation through a manoeuvre.
///
/// `outputs` always holds one entry per manoeuvre sample; after a failure the
/// tail repeats the last valid state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub outputs: OutputStates,
    pub failure: Option<TickFailure>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunProgress {
    pub done: bool,
    pub ticks_done: usize,
    pub total_ticks: usize,
    pub failure: Option<String>,
}

/// Advances a simulation through a manoeuvre in caller-sized batches.
pub struct ManoeuvreRunner {
    simulation: Simulation,
    manoeuvre: Manoeuvre,
    outputs: OutputStates,
    initial: CurrentState,
    next: usize,
    failure: Option<TickFailure>,
}

impl ManoeuvreRunner {
    pub fn new(simulation: Simulation, manoeuvre: Manoeuvre) -> Self {
        let initial = simulation.state().clone();
        Self {
            outputs: OutputStates::with_capacity(manoeuvre.len()),
            simulation,
            manoeuvre,
            initial,
            next: 0,
            failure: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.failure.is_some() || self.next >= self.manoeuvre.len()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Runs up to `batch_size` ticks and reports progress.
    pub fn run_steps(&mut self, batch_size: usize) -> RunProgress {
        for _ in 0..batch_size {
            if self.is_done() {
                break;
            }
            let Some(input) = self.manoeuvre.get(self.next) else {
                break;
            };

            match self
                .simulation
                .tick(input.throttle, input.brake, input.steering)
            {
                Ok(state) => self.outputs.push(state.clone()),
                Err(error) => {
                    self.failure = Some(TickFailure {
                        tick: self.next,
                        error,
                    });
                }
            }
            self.next += 1;

            if self.failure.is_none() && self.next == self.manoeuvre.len() {
                tracing::info!(ticks = self.next, "manoeuvre complete");
            }
        }
        self.progress()
    }

    pub fn progress(&self) -> RunProgress {
        RunProgress {
            done: self.is_done(),
            ticks_done: self.outputs.len(),
            total_ticks: self.manoeuvre.len(),
            failure: self
                .failure
                .as_ref()
                .map(|failure| format!("tick {}: {}", failure.tick, failure.error)),
        }
    }

    /// The padded output log, once the run is done.
    pub fn outcome(&self) -> Option<RunOutcome> {
        if !self.is_done() {
            return None;
        }
        let mut outputs = self.outputs.clone();
        outputs.pad_to(self.manoeuvre.len(), &self.initial);
        Some(RunOutcome {
            outputs,
            failure: self.failure.clone(),
        })
    }

    /// Runs the remaining ticks and returns the padded output log.
    pub fn into_outcome(mut self) -> RunOutcome {
        while !self.is_done() {
            self.run_steps(self.manoeuvre.len());
        }
        self.outputs.pad_to(self.manoeuvre.len(), &self.initial);
        RunOutcome {
            outputs: self.outputs,
            failure: self.failure,
        }
    }
}
