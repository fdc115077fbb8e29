//! Powertrain stage: gear selection, engine, torque converter, brakes.
//!
//! The stage owns two countdown timers that persist across ticks:
//! - the shift grace period, during which no gear change is evaluated;
//! - the converter re-synchronisation window, during which the effective
//!   throttle is held at [`SYNC_THROTTLE`].
//!
//! Both start on a gear change and run independently of each other.

use crate::error::SimulationError;
use crate::parameters::{StaticParameters, THROTTLE_BUCKETS};
use crate::state::CurrentState;
use nalgebra::Vector4;
use std::sync::Arc;

/// Effective throttle while the converter re-synchronises after a shift.
pub const SYNC_THROTTLE: f64 = 0.2;

/// Grace ticks added whenever the effective throttle changes.
const THROTTLE_CHANGE_GRACE: u32 = 2;

/// Shift-table row for a throttle position: nearest tenth, half away from zero.
pub fn throttle_bucket(throttle: f64) -> usize {
    let top = (THROTTLE_BUCKETS - 1) as f64;
    (throttle * top).round().clamp(0.0, top) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

pub struct Powertrain {
    params: Arc<StaticParameters>,
    grace_ticks: u32,
    sync_ticks: u32,
    previous_throttle: f64,
}

impl Powertrain {
    pub fn new(params: Arc<StaticParameters>) -> Self {
        Self {
            params,
            grace_ticks: 0,
            sync_ticks: 0,
            previous_throttle: 0.0,
        }
    }

    pub fn grace_ticks(&self) -> u32 {
        self.grace_ticks
    }

    pub fn sync_ticks(&self) -> u32 {
        self.sync_ticks
    }

    pub fn tick(
        &mut self,
        state: &mut CurrentState,
        throttle: f64,
        brake: f64,
    ) -> Result<(), SimulationError> {
        let p = Arc::clone(&self.params);
        let engine = &p.powertrain.engine;
        let pedal = throttle;

        if self.select_gear(state, pedal).is_some() {
            self.sync_ticks = p.powertrain.converter.sync_ticks;
        }

        let mut throttle = throttle;
        if self.sync_ticks > 0 {
            self.sync_ticks -= 1;
            throttle = SYNC_THROTTLE;
        }

        if self.previous_throttle != throttle {
            self.grace_ticks += THROTTLE_CHANGE_GRACE;
        }
        self.previous_throttle = throttle;

        if state.engine_w < engine.idle_w {
            state.engine_w = engine.idle_w;
        }

        let engine_torque = throttle * engine.torque_curve.eval(state.engine_w)?;
        let converter_out = self.couple(state, engine_torque)?;

        let final_ratio = p.powertrain.final_ratio(state.gear);
        let mean_wheel_acc = state.wheel_w_acc.mean();
        let traction = converter_out * final_ratio * p.powertrain.gearbox.efficiency
            - p.powertrain.reflected_inertia(state.gear) * mean_wheel_acc;

        let wheel_torque = if brake > 0.0 {
            Vector4::zeros()
        } else {
            p.powertrain.bias * traction
        };
        let brake_torque = p.brake.brake_bias * (brake * p.brake.max_braking_torque);

        let stopped = state.is_stopped();
        state.powertrain_net_torque = if stopped && (wheel_torque - brake_torque).mean() <= 0.0 {
            tracing::debug!(brake, throttle = pedal, "holding stopped vehicle: no forward torque");
            Vector4::zeros()
        } else if stopped && (brake > 0.0 || pedal == 0.0) {
            tracing::debug!(brake, throttle = pedal, "holding stopped vehicle: no demand");
            Vector4::zeros()
        } else {
            wheel_torque - brake_torque
        };

        if state.engine_w > engine.maximum_w {
            state.engine_w = engine.maximum_w;
        }

        state.ensure_finite()
    }

    /// Evaluates the shift tables for the pedal throttle and applies at most
    /// one gear change.
    fn select_gear(&mut self, state: &mut CurrentState, throttle: f64) -> Option<Shift> {
        if self.grace_ticks > 0 {
            self.grace_ticks -= 1;
            return None;
        }

        let gearbox = &self.params.powertrain.gearbox;
        let bucket = throttle_bucket(throttle);
        let shift = if state.engine_w > gearbox.upshift_w(bucket, state.gear) {
            (state.gear < gearbox.top_gear()).then_some(Shift::Up)
        } else if state.engine_w < gearbox.downshift_w(bucket, state.gear) {
            (state.gear > 1).then_some(Shift::Down)
        } else {
            None
        }?;

        let from = state.gear;
        state.gear = match shift {
            Shift::Up => from + 1,
            Shift::Down => from - 1,
        };
        self.grace_ticks = gearbox.min_shift_interval;
        tracing::debug!(
            ?shift,
            from,
            to = state.gear,
            engine_w = state.engine_w,
            "gear change"
        );
        Some(shift)
    }

    /// Couples the engine to the driveline and returns the torque delivered
    /// to the gearbox input. Below the lock-up ratio the converter multiplies
    /// torque and the engine speed is integrated; at or above it the engine
    /// is locked to the turbine.
    fn couple(&self, state: &mut CurrentState, engine_torque: f64) -> Result<f64, SimulationError> {
        let p = &*self.params;
        let converter = &p.powertrain.converter;
        let turbine_w = p.powertrain.final_ratio(state.gear) * state.wheel_w_vel.mean();
        let speed_ratio = turbine_w / state.engine_w;

        if speed_ratio >= converter.lock_up_ratio {
            state.engine_w = turbine_w;
            return Ok(engine_torque);
        }

        let speed_ratio = speed_ratio.max(0.0);
        let capacity = converter.capacity_factor.eval(speed_ratio)?;
        let multiplication = converter.torque_ratio.eval(speed_ratio)?;

        let input_torque = capacity * state.engine_w * state.engine_w;
        let engine_acc = (engine_torque - input_torque) / p.powertrain.engine.inertia;
        state.engine_w += engine_acc * p.time_step;
        Ok(multiplication * input_torque)
    }
}

#[cfg(test)]
mod tests {
    use super::{throttle_bucket, Powertrain, SYNC_THROTTLE};
    use crate::error::SimulationError;
    use crate::parameters::StaticParameters;
    use crate::state::{ChassisState, CurrentState};
    use crate::test_fixtures::{sedan_config, sedan_parameters};
    use nalgebra::Vector4;
    use std::sync::Arc;

    fn setup(vx: f64, gear: usize) -> (Powertrain, CurrentState, Arc<StaticParameters>) {
        let params = Arc::new(sedan_parameters());
        let chassis = ChassisState::default().with_velocity(vx, 0.0, 0.0);
        let state = CurrentState::new(&params, chassis, gear).expect("state");
        (Powertrain::new(Arc::clone(&params)), state, params)
    }

    #[test]
    fn throttle_bucket_rounds_to_nearest_tenth() {
        assert_eq!(throttle_bucket(0.0), 0);
        assert_eq!(throttle_bucket(0.04), 0);
        assert_eq!(throttle_bucket(0.05), 1);
        assert_eq!(throttle_bucket(0.55), 6);
        assert_eq!(throttle_bucket(1.0), 10);
        assert_eq!(throttle_bucket(1.7), 10);
        assert_eq!(throttle_bucket(-0.3), 0);
    }

    #[test]
    fn stopped_vehicle_without_demand_gets_no_torque() {
        let (mut powertrain, mut state, _) = setup(0.0, 1);
        powertrain.tick(&mut state, 0.0, 0.0).expect("tick");
        assert_eq!(state.powertrain_net_torque, Vector4::zeros());

        powertrain.tick(&mut state, 0.0, 1.0).expect("tick");
        assert_eq!(state.powertrain_net_torque, Vector4::zeros());
    }

    #[test]
    fn brake_overrides_drive_torque() {
        let (mut powertrain, mut state, params) = setup(10.0, 2);
        powertrain.tick(&mut state, 1.0, 0.5).expect("tick");
        let expected = -params.brake.brake_bias * (0.5 * params.brake.max_braking_torque);
        assert_eq!(state.powertrain_net_torque, expected);
    }

    #[test]
    fn throttle_drives_rear_wheels_from_rest() {
        let (mut powertrain, mut state, _) = setup(0.0, 1);
        powertrain.tick(&mut state, 1.0, 0.0).expect("tick");
        let torque = state.powertrain_net_torque;
        assert_eq!(torque[0], 0.0);
        assert!(torque[1] > 0.0);
        assert_eq!(torque[1], torque[3]);
        assert!(state.engine_w > sedan_parameters().powertrain.engine.idle_w);
    }

    #[test]
    fn engine_speed_floors_at_idle_and_clamps_at_maximum() {
        let (mut powertrain, mut state, params) = setup(0.0, 1);
        state.engine_w = 1.0;
        powertrain.tick(&mut state, 0.0, 0.0).expect("tick");
        assert!(state.engine_w <= params.powertrain.engine.idle_w);
        assert!(state.engine_w > 0.9 * params.powertrain.engine.idle_w);

        // Locked to a turbine spinning far above the redline.
        let (mut powertrain, mut state, params) = setup(60.0, 1);
        powertrain.tick(&mut state, 0.5, 0.0).expect("tick");
        assert_eq!(state.engine_w, params.powertrain.engine.maximum_w);
    }

    #[test]
    fn upshift_starts_grace_period_and_converter_sync() {
        let (mut powertrain, mut state, params) = setup(10.0, 1);
        let threshold = params.powertrain.gearbox.upshift_w(10, 1);
        state.engine_w = threshold + 1.0;

        powertrain.tick(&mut state, 1.0, 0.0).expect("tick");
        assert_eq!(state.gear, 2);
        let interval = params.powertrain.gearbox.min_shift_interval;
        // The throttle also changed from its initial zero in this tick.
        assert_eq!(powertrain.grace_ticks(), interval + 2);
        assert_eq!(powertrain.sync_ticks(), params.powertrain.converter.sync_ticks - 1);
        assert_eq!(powertrain.previous_throttle, SYNC_THROTTLE);
    }

    #[test]
    fn shifts_at_gear_limits_are_no_ops() {
        let (mut powertrain, mut state, params) = setup(0.0, 1);
        state.engine_w = params.powertrain.engine.idle_w;
        powertrain.tick(&mut state, 0.0, 0.0).expect("tick");
        assert_eq!(state.gear, 1);
        assert_eq!(powertrain.grace_ticks(), 0);

        let top = params.top_gear();
        let (mut powertrain, mut state, params) = setup(0.0, top);
        state.engine_w = params.powertrain.engine.maximum_w;
        powertrain.tick(&mut state, 0.0, 0.0).expect("tick");
        assert_eq!(state.gear, top);
    }

    #[test]
    fn grace_period_blocks_consecutive_shifts() {
        let (mut powertrain, mut state, params) = setup(10.0, 1);
        let threshold = params.powertrain.gearbox.upshift_w(10, 1);
        state.engine_w = threshold + 1.0;
        powertrain.tick(&mut state, 1.0, 0.0).expect("tick");
        assert_eq!(state.gear, 2);

        let grace = powertrain.grace_ticks();
        state.engine_w = params.powertrain.engine.maximum_w;
        powertrain.tick(&mut state, 1.0, 0.0).expect("tick");
        assert_eq!(state.gear, 2);
        assert_eq!(powertrain.grace_ticks(), grace - 1);
    }

    #[test]
    fn torque_lookup_outside_curve_is_fatal() {
        let mut config = sedan_config();
        config.powertrain.engine.w_table[0] = 1000.0;
        let params = Arc::new(StaticParameters::new(&config, 1000.0).expect("params"));
        let mut state =
            CurrentState::new(&params, ChassisState::default(), 1).expect("state");
        let mut powertrain = Powertrain::new(params);

        let err = powertrain.tick(&mut state, 0.5, 0.0).expect_err("out of domain");
        assert!(matches!(
            err,
            SimulationError::OutOfDomain {
                table: "powertrain.engine.torque_max",
                ..
            }
        ));
    }
}
