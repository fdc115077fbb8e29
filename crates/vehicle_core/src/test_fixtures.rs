//! Shared test vehicle: a rear-wheel-drive sedan with an eight-speed automatic.

use crate::parameters::{
    AerodynamicsParameters, BodyParameters, BrakeConfig, DifferentialParameters, EngineConfig,
    GearboxConfig, LateralTireConfig, LongitudinalTireConfig, PowertrainConfig,
    StaticParameters, SteeringParameters, SuspensionParameters, TireConfig,
    TorqueConverterConfig, VehicleConfig, THROTTLE_BUCKETS,
};

const GEAR_RATIOS: [f64; 9] = [0.0, 4.7, 3.1, 2.1, 1.67, 1.29, 1.0, 0.84, 0.67];

fn shift_rows(base_rpm: f64, rpm_per_bucket: f64) -> Vec<Vec<f64>> {
    (0..THROTTLE_BUCKETS)
        .map(|bucket| vec![base_rpm + rpm_per_bucket * bucket as f64; GEAR_RATIOS.len()])
        .collect()
}

pub(crate) fn sedan_config() -> VehicleConfig {
    VehicleConfig {
        body: BodyParameters {
            lf: 1.4,
            lr: 1.5,
            wl: 0.8,
            wr: 0.8,
            mass: 1800.0,
            sz: 0.55,
            i_x_s: 600.0,
            i_y_s: 2500.0,
            i_z: 3000.0,
        },
        suspension: SuspensionParameters {
            spring_rate: 40_000.0,
            damping_rate: 3_500.0,
            roll_bar_stiffness: 8_000.0,
            roll_centre_height: 0.1,
            pitch_centre_height: 0.15,
            unsprung_mass: 50.0,
        },
        tire: TireConfig {
            dynamic_radius: [0.33; 4],
            longitudinal: LongitudinalTireConfig {
                peak_friction: 1.0,
                shape_factor: 1.65,
                slip_stiffness: 12.0,
            },
            lateral: LateralTireConfig {
                peak_friction: 0.95,
                shape_factor: 1.3,
                cornering_coefficient: 10.0,
            },
            rolling_resistance_coefficient: 0.015,
            inertia: 1.2,
        },
        powertrain: PowertrainConfig {
            bias: [0.0, 0.5, 0.0, 0.5],
            engine: EngineConfig {
                w_table: vec![800.0, 1500.0, 2500.0, 3500.0, 4500.0, 5500.0, 6500.0, 7000.0],
                torque_max: vec![300.0, 450.0, 600.0, 650.0, 650.0, 620.0, 560.0, 500.0],
                idle_rpm: 800.0,
                minimum_rpm: 800.0,
                maximum_rpm: 7000.0,
                inertia: 0.25,
            },
            gearbox: GearboxConfig {
                gear_ratio: GEAR_RATIOS.to_vec(),
                gear_max_rpm: shift_rows(2000.0, 400.0),
                gear_min_rpm: shift_rows(1000.0, 150.0),
                efficiency: 0.9,
                inertia: 0.05,
                min_gear_change_interval: 200,
            },
            differential: DifferentialParameters {
                ratio: 3.15,
                driveshaft_inertia: 0.01,
            },
            torque_converter: TorqueConverterConfig {
                speed_ratio: vec![0.0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0],
                ratio: vec![2.0, 1.8, 1.55, 1.3, 1.1, 1.0, 1.0],
                factor: vec![
                    0.0065, 0.0064, 0.0062, 0.0058, 0.0050, 0.0040, 0.0030, 0.0020, 0.0010,
                    0.0005, 0.0001,
                ],
                lock_up_ratio: 0.9,
                converter_sync_time: 50,
            },
        },
        brake: BrakeConfig {
            max_braking_torque: 8_000.0,
            brake_bias: [0.3, 0.2, 0.3, 0.2],
        },
        steering: SteeringParameters {
            maximum_steering_angle: 0.6,
            ratio: 1.0,
        },
        aerodynamics: AerodynamicsParameters {
            air_drag_coefficient: 0.3,
            front_area: 2.2,
            air_density: 1.2,
        },
    }
}

pub(crate) fn sedan_parameters() -> StaticParameters {
    StaticParameters::new(&sedan_config(), 1000.0).expect("fixture parameters")
}
