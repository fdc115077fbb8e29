//! The mutable vehicle state threaded through every simulation stage.
//!
//! All per-wheel vectors use the wheel order FL, RL, FR, RR.

use crate::body;
use crate::error::{ConfigError, SimulationError};
use crate::parameters::StaticParameters;
use crate::traits::RoadProfile;
use nalgebra::{Matrix3x4, Vector3, Vector4};
use serde::Serialize;

/// Speeds at or below this are treated as standstill (m/s).
pub const STANDSTILL_SPEED: f64 = 1e-6;

/// Rigid-body pose and motion of the chassis.
///
/// Euler angles are only writable through setters so the cached sines and
/// cosines can never go stale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChassisState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    roll: f64,
    pitch: f64,
    yaw: f64,
    sin_roll: f64,
    cos_roll: f64,
    sin_pitch: f64,
    cos_pitch: f64,
    sin_yaw: f64,
    cos_yaw: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    /// Roll rate (rad/s).
    pub wx: f64,
    /// Pitch rate (rad/s).
    pub wy: f64,
    /// Yaw rate (rad/s).
    pub wz: f64,
    pub wx_dot: f64,
    pub wy_dot: f64,
    pub wz_dot: f64,
}

impl Default for ChassisState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            sin_roll: 0.0,
            cos_roll: 1.0,
            sin_pitch: 0.0,
            cos_pitch: 1.0,
            sin_yaw: 0.0,
            cos_yaw: 1.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            acc_x: 0.0,
            acc_y: 0.0,
            acc_z: 0.0,
            wx: 0.0,
            wy: 0.0,
            wz: 0.0,
            wx_dot: 0.0,
            wy_dot: 0.0,
            wz_dot: 0.0,
        }
    }
}

impl ChassisState {
    pub fn with_position(mut self, x: f64, y: f64, z: f64) -> Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    pub fn with_attitude(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.set_roll(roll);
        self.set_pitch(pitch);
        self.set_yaw(yaw);
        self
    }

    pub fn with_velocity(mut self, vx: f64, vy: f64, vz: f64) -> Self {
        self.vx = vx;
        self.vy = vy;
        self.vz = vz;
        self
    }

    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn sin_roll(&self) -> f64 {
        self.sin_roll
    }

    pub fn cos_roll(&self) -> f64 {
        self.cos_roll
    }

    pub fn sin_pitch(&self) -> f64 {
        self.sin_pitch
    }

    pub fn cos_pitch(&self) -> f64 {
        self.cos_pitch
    }

    pub fn sin_yaw(&self) -> f64 {
        self.sin_yaw
    }

    pub fn cos_yaw(&self) -> f64 {
        self.cos_yaw
    }

    pub fn set_roll(&mut self, roll: f64) {
        self.roll = roll;
        (self.sin_roll, self.cos_roll) = roll.sin_cos();
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch;
        (self.sin_pitch, self.cos_pitch) = pitch.sin_cos();
    }

    pub fn set_yaw(&mut self, yaw: f64) {
        self.yaw = yaw;
        (self.sin_yaw, self.cos_yaw) = yaw.sin_cos();
    }

    fn ensure_finite(&self) -> Result<(), SimulationError> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("z", self.z),
            ("roll", self.roll),
            ("pitch", self.pitch),
            ("yaw", self.yaw),
            ("vx", self.vx),
            ("vy", self.vy),
            ("vz", self.vz),
            ("acc_x", self.acc_x),
            ("acc_y", self.acc_y),
            ("acc_z", self.acc_z),
            ("wx", self.wx),
            ("wy", self.wy),
            ("wz", self.wz),
            ("wx_dot", self.wx_dot),
            ("wy_dot", self.wy_dot),
            ("wz_dot", self.wz_dot),
        ];
        for (field, value) in fields {
            check(field, value)?;
        }
        Ok(())
    }
}

/// Per-wheel suspension travel and the resulting strut force.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuspensionState {
    pub displacement: Vector4<f64>,
    pub displacement_dot: Vector4<f64>,
    /// Road height under each contact point.
    pub road: Vector4<f64>,
    pub force: Vector4<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentState {
    pub chassis: ChassisState,
    /// Front road-wheel steer angle (rad).
    pub delta: f64,
    pub gear: usize,
    /// Engine angular speed (rad/s).
    pub engine_w: f64,
    pub wheel_w_vel: Vector4<f64>,
    pub wheel_w_acc: Vector4<f64>,
    pub slip_x: Vector4<f64>,
    pub slip_y: Vector4<f64>,
    pub slip_y_rate: Vector4<f64>,
    /// Tire-frame longitudinal force.
    pub tire_fx: Vector4<f64>,
    /// Tire-frame lateral force.
    pub tire_fy: Vector4<f64>,
    /// Vehicle-frame wheel forces; rows Fx, Fy, Fz, one column per wheel.
    pub vehicle_forces: Matrix3x4<f64>,
    pub sum_wheel_forces: Vector3<f64>,
    pub wheel_load_z: Vector4<f64>,
    pub suspension: SuspensionState,
    pub powertrain_net_torque: Vector4<f64>,
    /// CG height at initialisation, the zero of suspension travel.
    pub reference_z_cg: f64,
}

impl CurrentState {
    /// Builds the initial state on a flat road.
    pub fn new(
        params: &StaticParameters,
        chassis: ChassisState,
        initial_gear: usize,
    ) -> Result<Self, ConfigError> {
        Self::on_road(params, chassis, initial_gear, &crate::traits::FlatRoad)
    }

    /// Builds the initial state with wheels rolling without slip, the engine
    /// at idle and the wheel loads in equilibrium with the initial attitude.
    pub fn on_road(
        params: &StaticParameters,
        chassis: ChassisState,
        initial_gear: usize,
        road: &dyn RoadProfile,
    ) -> Result<Self, ConfigError> {
        let top = params.top_gear();
        if initial_gear < 1 || initial_gear > top {
            return Err(ConfigError::InitialGear {
                gear: initial_gear,
                top,
            });
        }
        if chassis.vx < 0.0 {
            return Err(ConfigError::NegativeSpeed(chassis.vx));
        }

        let reference_z_cg = chassis.z;
        let road_heights = body::contact_road_heights(params, &chassis, road);
        let displacement =
            body::suspension_displacement(params, &chassis, reference_z_cg, &road_heights);
        let displacement_dot = Vector4::zeros();
        let force = body::suspension_force(params, &chassis, &displacement, &displacement_dot);
        let wheel_load_z = body::wheel_loads(params, &chassis, &force);

        let mut vehicle_forces = Matrix3x4::zeros();
        vehicle_forces.set_row(2, &wheel_load_z.transpose());

        let wheel_w_vel = params.tire.dynamic_radius.map(|r| chassis.vx / r);

        let state = Self {
            chassis,
            delta: 0.0,
            gear: initial_gear,
            engine_w: params.powertrain.engine.idle_w,
            wheel_w_vel,
            wheel_w_acc: Vector4::zeros(),
            slip_x: Vector4::zeros(),
            slip_y: Vector4::zeros(),
            slip_y_rate: Vector4::zeros(),
            tire_fx: Vector4::zeros(),
            tire_fy: Vector4::zeros(),
            vehicle_forces,
            sum_wheel_forces: Vector3::zeros(),
            wheel_load_z,
            suspension: SuspensionState {
                displacement,
                displacement_dot,
                road: road_heights,
                force,
            },
            powertrain_net_torque: Vector4::zeros(),
            reference_z_cg,
        };

        state.ensure_finite().map_err(|err| match err {
            SimulationError::InvalidState { field, value } => {
                ConfigError::NonFinite { field, value }
            }
            _ => ConfigError::NonFinite {
                field: "initial state",
                value: f64::NAN,
            },
        })?;
        Ok(state)
    }

    /// Tire forces in the tire frame stacked with the wheel loads:
    /// rows fx, fy, fz.
    pub fn compiled_wheel_forces(&self) -> Matrix3x4<f64> {
        Matrix3x4::from_rows(&[
            self.tire_fx.transpose(),
            self.tire_fy.transpose(),
            self.wheel_load_z.transpose(),
        ])
    }

    pub fn is_stopped(&self) -> bool {
        self.chassis.vx <= STANDSTILL_SPEED
    }

    /// Checks every numeric field and reports the first non-finite one.
    pub fn ensure_finite(&self) -> Result<(), SimulationError> {
        self.chassis.ensure_finite()?;
        check("delta", self.delta)?;
        check("engine_w", self.engine_w)?;
        check_all("wheel_w_vel", self.wheel_w_vel.iter())?;
        check_all("wheel_w_acc", self.wheel_w_acc.iter())?;
        check_all("slip_x", self.slip_x.iter())?;
        check_all("slip_y", self.slip_y.iter())?;
        check_all("slip_y_rate", self.slip_y_rate.iter())?;
        check_all("tire_fx", self.tire_fx.iter())?;
        check_all("tire_fy", self.tire_fy.iter())?;
        check_all("vehicle_forces", self.vehicle_forces.iter())?;
        check_all("sum_wheel_forces", self.sum_wheel_forces.iter())?;
        check_all("wheel_load_z", self.wheel_load_z.iter())?;
        check_all("suspension.displacement", self.suspension.displacement.iter())?;
        check_all("suspension.displacement_dot", self.suspension.displacement_dot.iter())?;
        check_all("suspension.road", self.suspension.road.iter())?;
        check_all("suspension.force", self.suspension.force.iter())?;
        check_all("powertrain_net_torque", self.powertrain_net_torque.iter())?;
        check("reference_z_cg", self.reference_z_cg)
    }
}

fn check(field: &'static str, value: f64) -> Result<(), SimulationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::InvalidState { field, value })
    }
}

fn check_all<'a>(
    field: &'static str,
    values: impl IntoIterator<Item = &'a f64>,
) -> Result<(), SimulationError> {
    values.into_iter().try_for_each(|&value| check(field, value))
}

#[cfg(test)]
mod tests {
    use super::{ChassisState, CurrentState};
    use crate::error::{ConfigError, SimulationError};
    use crate::test_fixtures::sedan_parameters;

    #[test]
    fn attitude_setters_refresh_trig_cache() {
        let mut chassis = ChassisState::default();
        chassis.set_yaw(std::f64::consts::FRAC_PI_2);
        assert!((chassis.sin_yaw() - 1.0).abs() < 1e-15);
        assert!(chassis.cos_yaw().abs() < 1e-15);

        let chassis = ChassisState::default().with_attitude(0.1, -0.05, 0.0);
        assert!((chassis.sin_roll() - 0.1f64.sin()).abs() < 1e-15);
        assert!((chassis.cos_pitch() - (-0.05f64).cos()).abs() < 1e-15);
    }

    #[test]
    fn initial_state_rolls_without_slip_at_idle() {
        let params = sedan_parameters();
        let chassis = ChassisState::default().with_velocity(12.0, 0.0, 0.0);
        let state = CurrentState::new(&params, chassis, 2).expect("state");

        assert_eq!(state.gear, 2);
        assert_eq!(state.engine_w, params.powertrain.engine.idle_w);
        for (w, r) in state.wheel_w_vel.iter().zip(params.tire.dynamic_radius.iter()) {
            assert!((w * r - 12.0).abs() < 1e-12);
        }
        assert_eq!(state.reference_z_cg, 0.0);
        assert_eq!(state.suspension.displacement, nalgebra::Vector4::zeros());
    }

    #[test]
    fn negative_initial_speed_is_rejected() {
        let params = sedan_parameters();
        let chassis = ChassisState::default().with_velocity(-5.0, 0.0, 0.0);
        assert_eq!(
            CurrentState::new(&params, chassis, 1).err(),
            Some(ConfigError::NegativeSpeed(-5.0))
        );
    }

    #[test]
    fn initial_loads_carry_the_vehicle_weight() {
        let params = sedan_parameters();
        let state = CurrentState::new(&params, ChassisState::default(), 1).expect("state");

        let weight = params.body.mass * params.gravity;
        assert!((state.wheel_load_z.sum() - weight).abs() < 1e-6);
        assert_eq!(state.vehicle_forces.row(2).into_owned(), state.wheel_load_z.transpose());
        assert_eq!(state.vehicle_forces.row(0).sum(), 0.0);

        let compiled = state.compiled_wheel_forces();
        assert_eq!(compiled.row(2).into_owned(), state.wheel_load_z.transpose());
    }

    #[test]
    fn rejects_initial_gear_outside_drive_range() {
        let params = sedan_parameters();
        let top = params.top_gear();
        assert_eq!(
            CurrentState::new(&params, ChassisState::default(), 0),
            Err(ConfigError::InitialGear { gear: 0, top })
        );
        assert!(CurrentState::new(&params, ChassisState::default(), top + 1).is_err());
        assert!(CurrentState::new(&params, ChassisState::default(), top).is_ok());
    }

    #[test]
    fn rejects_non_finite_initial_condition() {
        let params = sedan_parameters();
        let chassis = ChassisState::default().with_velocity(f64::NAN, 0.0, 0.0);
        assert!(matches!(
            CurrentState::new(&params, chassis, 1),
            Err(ConfigError::NonFinite { field: "vx", .. })
        ));
    }

    #[test]
    fn ensure_finite_reports_first_bad_field() {
        let params = sedan_parameters();
        let mut state = CurrentState::new(&params, ChassisState::default(), 1).expect("state");
        state.slip_y[2] = f64::INFINITY;
        state.engine_w = f64::NAN;

        match state.ensure_finite() {
            Err(SimulationError::InvalidState { field, value }) => {
                assert_eq!(field, "engine_w");
                assert!(value.is_nan());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
