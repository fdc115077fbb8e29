//! Wheel stage: steering, tire slip, tire forces and wheel spin.

use crate::error::SimulationError;
use crate::parameters::StaticParameters;
use crate::state::CurrentState;
use nalgebra::Vector4;
use std::sync::Arc;

/// Below this speed (m/s) slip denominators are held at this value.
pub const MIN_SLIP_SPEED: f64 = 15.0;

pub struct Wheels {
    params: Arc<StaticParameters>,
}

impl Wheels {
    pub fn new(params: Arc<StaticParameters>) -> Self {
        Self { params }
    }

    /// Maps a normalized steering input in `[-1, 1]` to the road-wheel angle.
    pub fn steer_angle(&self, steering: f64) -> f64 {
        let steering_params = &self.params.steering;
        steering * steering_params.maximum_steering_angle / steering_params.ratio
    }

    pub fn tick(&self, state: &mut CurrentState, steering: f64) -> Result<(), SimulationError> {
        let p = &*self.params;
        state.delta = self.steer_angle(steering);

        state.slip_x = longitudinal_slip(p, state);

        let previous_slip_y = state.slip_y;
        state.slip_y = lateral_slip(p, state);
        state.slip_y_rate = (previous_slip_y - state.slip_y) / p.time_step;

        let fz = state.wheel_load_z;
        state.tire_fx = fz.zip_map(&state.slip_x, |fz, slip| p.tire.longitudinal.force(fz, slip));
        state.tire_fy = fz.zip_map(&state.slip_y, |fz, slip| p.tire.lateral.force(fz, slip));

        let steer = Vector4::new(state.delta, 0.0, state.delta, 0.0);
        for i in 0..4 {
            let (sin, cos) = steer[i].sin_cos();
            let (fx, fy) = (state.tire_fx[i], state.tire_fy[i]);
            state.vehicle_forces[(0, i)] = fx * cos - fy * sin;
            state.vehicle_forces[(1, i)] = fy * cos + fx * sin;
        }

        self.integrate_spin(state);
        state.ensure_finite()
    }

    fn integrate_spin(&self, state: &mut CurrentState) {
        let p = &*self.params;
        let inertia = p.tire.inertia + p.powertrain.reflected_inertia(state.gear);
        let reaction = state.tire_fx.component_mul(&p.tire.dynamic_radius);
        let rolling = state.wheel_load_z * p.tire.rolling_resistance_coefficient;

        state.wheel_w_acc = (state.powertrain_net_torque - reaction - rolling) / inertia;
        state.wheel_w_vel += state.wheel_w_acc * p.time_step;

        for i in 0..4 {
            if state.wheel_w_vel[i] <= 0.0 {
                state.wheel_w_vel[i] = 0.0;
                state.wheel_w_acc[i] = 0.0;
            }
        }
    }
}

fn longitudinal_slip(params: &StaticParameters, state: &CurrentState) -> Vector4<f64> {
    let vx = state.chassis.vx;
    let surface = state.wheel_w_vel.component_mul(&params.tire.dynamic_radius);
    surface.map(|v| (v - vx) / v.abs().max(vx.abs()).max(MIN_SLIP_SPEED))
}

fn lateral_slip(params: &StaticParameters, state: &CurrentState) -> Vector4<f64> {
    let c = &state.chassis;
    let long = params.longitudinal_distance();
    let lat = params.lateral_distance();
    let low_speed = c.vx <= MIN_SLIP_SPEED && -params.body.wr * c.wz <= MIN_SLIP_SPEED;
    let steer = Vector4::new(state.delta, 0.0, state.delta, 0.0);

    Vector4::from_fn(|i, _| {
        let denominator = if low_speed {
            MIN_SLIP_SPEED
        } else {
            c.vx - lat[i] * c.wz
        };
        steer[i] - ((c.vy + long[i] * c.wz) / denominator).atan()
    })
}
