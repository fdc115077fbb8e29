//! Chassis stage: suspension, wheel loads and rigid-body integration.

use crate::error::SimulationError;
use crate::parameters::StaticParameters;
use crate::state::{ChassisState, CurrentState};
use crate::traits::RoadProfile;
use nalgebra::{Vector3, Vector4};
use std::sync::Arc;

pub struct Body {
    params: Arc<StaticParameters>,
}

impl Body {
    pub fn new(params: Arc<StaticParameters>) -> Self {
        Self { params }
    }

    /// Advances the chassis by one time step.
    ///
    /// The wheel forces are summed before the loads are refreshed, so the new
    /// loads only take effect in the next tick's tire model.
    pub fn tick(
        &self,
        state: &mut CurrentState,
        road: &dyn RoadProfile,
    ) -> Result<(), SimulationError> {
        let p = &*self.params;
        let dt = p.time_step;

        let sum: Vector3<f64> = state.vehicle_forces.column_sum();
        state.sum_wheel_forces = sum;

        let start = state.chassis;
        let road_heights = contact_road_heights(p, &start, road);
        let displacement =
            suspension_displacement(p, &start, state.reference_z_cg, &road_heights);
        let displacement_dot = (displacement - state.suspension.displacement) / dt;
        let force = suspension_force(p, &start, &displacement, &displacement_dot);
        state.suspension.road = road_heights;
        state.suspension.displacement = displacement;
        state.suspension.displacement_dot = displacement_dot;
        state.suspension.force = force;

        state.wheel_load_z = wheel_loads(p, &start, &force);
        state.vehicle_forces.set_row(2, &state.wheel_load_z.transpose());

        integrate_translation(p, &mut state.chassis, &sum, &force);
        integrate_rotation(p, state, &force);

        state.ensure_finite()
    }
}

/// World position of each tire contact point.
pub(crate) fn contact_points(params: &StaticParameters, chassis: &ChassisState) -> [(f64, f64); 4] {
    let long = params.longitudinal_distance();
    let lat = params.lateral_distance();
    let (s, c) = (chassis.sin_yaw(), chassis.cos_yaw());
    std::array::from_fn(|i| {
        (
            chassis.x + long[i] * c - lat[i] * s,
            chassis.y + long[i] * s + lat[i] * c,
        )
    })
}

pub(crate) fn contact_road_heights(
    params: &StaticParameters,
    chassis: &ChassisState,
    road: &dyn RoadProfile,
) -> Vector4<f64> {
    let points = contact_points(params, chassis);
    Vector4::from_fn(|i, _| road.height(points[i].0, points[i].1))
}

/// Suspension travel per corner relative to the reference CG height.
pub(crate) fn suspension_displacement(
    params: &StaticParameters,
    chassis: &ChassisState,
    reference_z_cg: f64,
    road_heights: &Vector4<f64>,
) -> Vector4<f64> {
    let long = params.longitudinal_distance();
    let lat = params.lateral_distance();
    let heave = chassis.z - reference_z_cg;
    Vector4::from_fn(|i, _| {
        heave - long[i] * chassis.sin_pitch() + lat[i] * chassis.sin_roll() - road_heights[i]
    })
}

/// Spring, damper and anti-roll-bar force per corner.
pub(crate) fn suspension_force(
    params: &StaticParameters,
    chassis: &ChassisState,
    displacement: &Vector4<f64>,
    displacement_dot: &Vector4<f64>,
) -> Vector4<f64> {
    let s = &params.suspension;
    let lat = params.lateral_distance();
    Vector4::from_fn(|i, _| {
        -s.spring_rate * displacement[i] - s.damping_rate * displacement_dot[i]
            + s.roll_bar_stiffness * chassis.sin_roll() / (2.0 * lat[i])
    })
}

/// Vertical wheel load: static weight, suspension force and load transfer
/// from the chassis accelerations.
pub(crate) fn wheel_loads(
    params: &StaticParameters,
    chassis: &ChassisState,
    suspension_force: &Vector4<f64>,
) -> Vector4<f64> {
    let b = &params.body;
    let s = &params.suspension;
    let l = params.wheel_base;
    let w = params.track_width;

    let xi_lon = Vector4::new(-b.lr / l, b.lf / l, -b.lr / l, b.lf / l);
    let xi_lat = Vector4::new(-b.wr / w, -b.wr / w, b.wl / w, b.wl / w);
    let longitudinal_transfer = xi_lon * (b.mass * chassis.acc_x * s.pitch_centre_height / l);
    let lateral_transfer = xi_lat * (b.mass * chassis.acc_y * s.roll_centre_height / w);

    params.sprung_mass.add_scalar(s.unsprung_mass) * params.gravity
        + suspension_force
        + longitudinal_transfer
        - lateral_transfer
}

fn integrate_translation(
    params: &StaticParameters,
    chassis: &mut ChassisState,
    sum: &Vector3<f64>,
    suspension_force: &Vector4<f64>,
) {
    let dt = params.time_step;
    let m = params.body.mass;
    let (vx, vy, wz) = (chassis.vx, chassis.vy, chassis.wz);

    chassis.acc_x = (sum.x - 0.5 * params.drag_factor * vx * vx) / m + vy * wz;
    chassis.vx += chassis.acc_x * dt;
    if chassis.vx <= crate::state::STANDSTILL_SPEED {
        chassis.vx = 0.0;
        chassis.acc_x = 0.0;
    }

    chassis.acc_y = sum.y / m + vx * wz;
    chassis.acc_z = suspension_force.sum() / m;
    chassis.vy += chassis.acc_y * dt;
    chassis.vz += chassis.acc_z * dt;

    let (s, c) = (chassis.sin_yaw(), chassis.cos_yaw());
    chassis.x += (vx * c - vy * s) * dt;
    chassis.y += (vx * s + vy * c) * dt;
    chassis.z += chassis.vz * dt;
}

fn integrate_rotation(params: &StaticParameters, state: &mut CurrentState, force: &Vector4<f64>) {
    let dt = params.time_step;
    let b = &params.body;
    let s = &params.suspension;
    let f = &state.vehicle_forces;
    let (fx, fy) = (f.row(0), f.row(1));

    // Columns are FL, RL, FR, RR.
    let mz = (fy[0] + fy[2]) * b.lf - (fy[1] + fy[3]) * b.lr + (fx[3] + fx[2]) * b.wr
        - (fx[1] + fx[0]) * b.wl;

    let sprung = params.sprung_mass.sum();
    let hsr = b.sz - s.roll_centre_height;
    let hsp = b.sz - s.pitch_centre_height;
    let long = params.longitudinal_distance();
    let lat = params.lateral_distance();

    let chassis = &mut state.chassis;
    chassis.wx_dot = (lat.dot(force)
        + sprung * hsr * (chassis.acc_y + params.gravity * chassis.sin_roll()))
        / b.i_x_s;
    chassis.wy_dot = -(long.dot(force)
        + sprung * hsp * (chassis.acc_x - params.gravity * chassis.sin_pitch()))
        / b.i_y_s;
    chassis.wz_dot = mz / b.i_z;

    chassis.wx += chassis.wx_dot * dt;
    chassis.wy += chassis.wy_dot * dt;
    chassis.wz += chassis.wz_dot * dt;

    chassis.set_roll(chassis.roll() + chassis.wx * dt);
    chassis.set_pitch(chassis.pitch() + chassis.wy * dt);
    chassis.set_yaw(chassis.yaw() + chassis.wz * dt);
}
