//! Vehicle parameter document and the immutable, derived parameter set.
//!
//! [`VehicleConfig`] mirrors the parameter document as supplied by the caller
//! (engine and shift speeds in RPM). [`StaticParameters::new`] validates it,
//! converts speeds to rad/s and derives the static load distribution in one
//! step. Once built, a `StaticParameters` value is only ever handed out behind
//! shared references.

use crate::error::{ensure_finite, ensure_positive, ConfigError};
use crate::interpolation::LookupTable;
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

/// Standard gravity used by the chassis and load models (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Conversion factor from revolutions per minute to rad/s.
pub const RPM_TO_RAD_PER_SEC: f64 = std::f64::consts::PI / 30.0;

/// Number of throttle buckets in the shift tables (throttle 0.0, 0.1, ..., 1.0).
pub const THROTTLE_BUCKETS: usize = 11;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub body: BodyParameters,
    pub suspension: SuspensionParameters,
    pub tire: TireConfig,
    pub powertrain: PowertrainConfig,
    pub brake: BrakeConfig,
    pub steering: SteeringParameters,
    pub aerodynamics: AerodynamicsParameters,
}

/// Chassis geometry and inertia. Distances are measured from the CG.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyParameters {
    /// CG to front axle (m).
    pub lf: f64,
    /// CG to rear axle (m).
    pub lr: f64,
    /// CG to left wheel plane (m).
    pub wl: f64,
    /// CG to right wheel plane (m).
    pub wr: f64,
    pub mass: f64,
    /// CG height (m).
    pub sz: f64,
    /// Sprung-mass roll inertia (kg·m²).
    pub i_x_s: f64,
    /// Sprung-mass pitch inertia (kg·m²).
    pub i_y_s: f64,
    /// Yaw inertia (kg·m²).
    pub i_z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuspensionParameters {
    pub spring_rate: f64,
    pub damping_rate: f64,
    pub roll_bar_stiffness: f64,
    pub roll_centre_height: f64,
    pub pitch_centre_height: f64,
    /// Unsprung mass per corner (kg).
    pub unsprung_mass: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TireConfig {
    /// Dynamic rolling radius per wheel, FL, RL, FR, RR (m).
    pub dynamic_radius: [f64; 4],
    pub longitudinal: LongitudinalTireConfig,
    pub lateral: LateralTireConfig,
    pub rolling_resistance_coefficient: f64,
    pub inertia: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LongitudinalTireConfig {
    pub peak_friction: f64,
    pub shape_factor: f64,
    pub slip_stiffness: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LateralTireConfig {
    pub peak_friction: f64,
    pub shape_factor: f64,
    pub cornering_coefficient: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowertrainConfig {
    /// Share of traction torque sent to each wheel, FL, RL, FR, RR.
    pub bias: [f64; 4],
    pub engine: EngineConfig,
    pub gearbox: GearboxConfig,
    pub differential: DifferentialParameters,
    pub torque_converter: TorqueConverterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine speed breakpoints of the full-load torque curve (RPM).
    pub w_table: Vec<f64>,
    /// Full-load torque at each breakpoint (N·m).
    pub torque_max: Vec<f64>,
    pub idle_rpm: f64,
    /// Carried in the parameter document; the idle speed is the operative floor.
    #[serde(default)]
    pub minimum_rpm: f64,
    pub maximum_rpm: f64,
    pub inertia: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearboxConfig {
    /// Ratio per gear; index 0 is the neutral slot, drive gears start at 1.
    pub gear_ratio: Vec<f64>,
    /// Upshift speed (RPM) indexed by `[throttle bucket][gear]`.
    pub gear_max_rpm: Vec<Vec<f64>>,
    /// Downshift speed (RPM) indexed by `[throttle bucket][gear]`.
    pub gear_min_rpm: Vec<Vec<f64>>,
    pub efficiency: f64,
    pub inertia: f64,
    /// Ticks after a shift during which no further shift is evaluated.
    #[serde(alias = "MIN_GEAR_CHANGE_INTERVAL")]
    pub min_gear_change_interval: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialParameters {
    pub ratio: f64,
    pub driveshaft_inertia: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorqueConverterConfig {
    /// Turbine/pump speed ratio breakpoints for the torque ratio table.
    pub speed_ratio: Vec<f64>,
    /// Torque multiplication at each speed ratio breakpoint.
    pub ratio: Vec<f64>,
    /// Capacity factor, evenly spaced over speed ratio 0..=1.
    pub factor: Vec<f64>,
    pub lock_up_ratio: f64,
    /// Ticks of reduced throttle after a gear shift.
    #[serde(alias = "CONVERTER_SYNC_TIME")]
    pub converter_sync_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrakeConfig {
    pub max_braking_torque: f64,
    /// Share of brake torque per wheel, FL, RL, FR, RR.
    pub brake_bias: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringParameters {
    /// Steering-wheel angle at full lock (rad).
    pub maximum_steering_angle: f64,
    /// Steering-wheel angle to road-wheel angle ratio.
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AerodynamicsParameters {
    pub air_drag_coefficient: f64,
    pub front_area: f64,
    pub air_density: f64,
}

/// Magic-Formula coefficients for one tire direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MagicFormula {
    /// Peak friction coefficient (D).
    pub peak_friction: f64,
    /// Shape factor (C).
    pub shape_factor: f64,
    /// Slip stiffness (B·C·D).
    pub stiffness: f64,
}

impl MagicFormula {
    /// `Fz · D · sin(C · atan(B/(C·D) · slip))`
    pub fn force(&self, fz: f64, slip: f64) -> f64 {
        let c = self.shape_factor;
        let d = self.peak_friction;
        fz * d * (c * (self.stiffness / (c * d) * slip).atan()).sin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TireParameters {
    pub dynamic_radius: Vector4<f64>,
    pub longitudinal: MagicFormula,
    pub lateral: MagicFormula,
    pub rolling_resistance_coefficient: f64,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineParameters {
    /// Full-load torque over engine speed (rad/s).
    pub torque_curve: LookupTable,
    pub idle_w: f64,
    pub maximum_w: f64,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GearboxParameters {
    pub ratios: Vec<f64>,
    /// Upshift speeds (rad/s), `[bucket][gear]`.
    pub max_w: Vec<Vec<f64>>,
    /// Downshift speeds (rad/s), `[bucket][gear]`.
    pub min_w: Vec<Vec<f64>>,
    pub efficiency: f64,
    pub inertia: f64,
    pub min_shift_interval: u32,
}

impl GearboxParameters {
    pub fn top_gear(&self) -> usize {
        self.ratios.len() - 1
    }

    pub fn ratio(&self, gear: usize) -> f64 {
        self.ratios[gear]
    }

    pub fn upshift_w(&self, bucket: usize, gear: usize) -> f64 {
        self.max_w[bucket][gear]
    }

    pub fn downshift_w(&self, bucket: usize, gear: usize) -> f64 {
        self.min_w[bucket][gear]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorqueConverterParameters {
    /// Torque multiplication over speed ratio.
    pub torque_ratio: LookupTable,
    /// Capacity factor over speed ratio; input torque is `k · w_engine²`.
    pub capacity_factor: LookupTable,
    pub lock_up_ratio: f64,
    pub sync_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowertrainParameters {
    pub bias: Vector4<f64>,
    pub engine: EngineParameters,
    pub gearbox: GearboxParameters,
    pub differential: DifferentialParameters,
    pub converter: TorqueConverterParameters,
}

impl PowertrainParameters {
    /// Gearbox times differential ratio for `gear`.
    pub fn final_ratio(&self, gear: usize) -> f64 {
        self.gearbox.ratio(gear) * self.differential.ratio
    }

    /// Gearbox and driveshaft inertia reflected to the wheels in `gear`.
    pub fn reflected_inertia(&self, gear: usize) -> f64 {
        let final_ratio = self.final_ratio(gear);
        self.gearbox.inertia * final_ratio * final_ratio
            + self.differential.driveshaft_inertia
                * self.differential.ratio
                * self.differential.ratio
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrakeParameters {
    pub max_braking_torque: f64,
    pub brake_bias: Vector4<f64>,
}

/// Validated, unit-converted vehicle parameters plus quantities derived once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticParameters {
    pub body: BodyParameters,
    pub suspension: SuspensionParameters,
    pub tire: TireParameters,
    pub powertrain: PowertrainParameters,
    pub brake: BrakeParameters,
    pub steering: SteeringParameters,
    pub aerodynamics: AerodynamicsParameters,

    pub wheel_base: f64,
    pub track_width: f64,
    /// Static share of the total weight on each wheel.
    pub wd: Vector4<f64>,
    /// Sprung mass carried by each corner (kg).
    pub sprung_mass: Vector4<f64>,
    /// `Cd · A · ρ`; the drag force is half of this times `vx²`.
    pub drag_factor: f64,
    pub gravity: f64,
    pub frequency: f64,
    pub time_step: f64,
}

impl StaticParameters {
    pub fn new(config: &VehicleConfig, frequency: f64) -> Result<Self, ConfigError> {
        let frequency = ensure_positive("frequency", frequency)?;

        let body = validate_body(config.body)?;
        let suspension = validate_suspension(config.suspension)?;
        let tire = build_tire(&config.tire)?;
        let powertrain = build_powertrain(&config.powertrain)?;
        let brake = build_brake(&config.brake)?;

        let steering = config.steering;
        ensure_finite("steering.maximum_steering_angle", steering.maximum_steering_angle)?;
        ensure_positive("steering.ratio", steering.ratio)?;

        let aerodynamics = config.aerodynamics;
        ensure_finite("aerodynamics.air_drag_coefficient", aerodynamics.air_drag_coefficient)?;
        ensure_finite("aerodynamics.front_area", aerodynamics.front_area)?;
        ensure_finite("aerodynamics.air_density", aerodynamics.air_density)?;

        let wheel_base = body.lr + body.lf;
        let track_width = body.wl + body.wr;
        let wd = Vector4::new(
            (body.lr / wheel_base) * (body.wr / track_width),
            (body.lf / wheel_base) * (body.wr / track_width),
            (body.lr / wheel_base) * (body.wl / track_width),
            (body.lf / wheel_base) * (body.wl / track_width),
        );
        let sprung_mass = wd.map(|share| body.mass * share - suspension.unsprung_mass);
        for &corner in sprung_mass.iter() {
            ensure_positive("sprung_mass", corner)?;
        }

        Ok(Self {
            body,
            suspension,
            tire,
            powertrain,
            brake,
            steering,
            aerodynamics,
            wheel_base,
            track_width,
            wd,
            sprung_mass,
            drag_factor: aerodynamics.air_drag_coefficient
                * aerodynamics.front_area
                * aerodynamics.air_density,
            gravity: GRAVITY,
            frequency,
            time_step: 1.0 / frequency,
        })
    }

    /// Signed longitudinal offset of each wheel from the CG, FL, RL, FR, RR.
    pub fn longitudinal_distance(&self) -> Vector4<f64> {
        Vector4::new(self.body.lf, -self.body.lr, self.body.lf, -self.body.lr)
    }

    /// Signed lateral offset of each wheel from the CG, FL, RL, FR, RR.
    pub fn lateral_distance(&self) -> Vector4<f64> {
        Vector4::new(self.body.wl, self.body.wl, -self.body.wr, -self.body.wr)
    }

    pub fn top_gear(&self) -> usize {
        self.powertrain.gearbox.top_gear()
    }
}

fn validate_body(body: BodyParameters) -> Result<BodyParameters, ConfigError> {
    ensure_positive("body.lf", body.lf)?;
    ensure_positive("body.lr", body.lr)?;
    ensure_positive("body.wl", body.wl)?;
    ensure_positive("body.wr", body.wr)?;
    ensure_positive("body.mass", body.mass)?;
    ensure_finite("body.sz", body.sz)?;
    ensure_positive("body.i_x_s", body.i_x_s)?;
    ensure_positive("body.i_y_s", body.i_y_s)?;
    ensure_positive("body.i_z", body.i_z)?;
    Ok(body)
}

fn validate_suspension(
    suspension: SuspensionParameters,
) -> Result<SuspensionParameters, ConfigError> {
    ensure_positive("suspension.spring_rate", suspension.spring_rate)?;
    ensure_finite("suspension.damping_rate", suspension.damping_rate)?;
    ensure_finite("suspension.roll_bar_stiffness", suspension.roll_bar_stiffness)?;
    ensure_finite("suspension.roll_centre_height", suspension.roll_centre_height)?;
    ensure_finite("suspension.pitch_centre_height", suspension.pitch_centre_height)?;
    ensure_finite("suspension.unsprung_mass", suspension.unsprung_mass)?;
    Ok(suspension)
}

fn build_tire(config: &TireConfig) -> Result<TireParameters, ConfigError> {
    for &radius in &config.dynamic_radius {
        ensure_positive("tire.dynamic_radius", radius)?;
    }
    let longitudinal = MagicFormula {
        peak_friction: ensure_positive(
            "tire.longitudinal.peak_friction",
            config.longitudinal.peak_friction,
        )?,
        shape_factor: ensure_positive(
            "tire.longitudinal.shape_factor",
            config.longitudinal.shape_factor,
        )?,
        stiffness: ensure_positive(
            "tire.longitudinal.slip_stiffness",
            config.longitudinal.slip_stiffness,
        )?,
    };
    let lateral = MagicFormula {
        peak_friction: ensure_positive("tire.lateral.peak_friction", config.lateral.peak_friction)?,
        shape_factor: ensure_positive("tire.lateral.shape_factor", config.lateral.shape_factor)?,
        stiffness: ensure_positive(
            "tire.lateral.cornering_coefficient",
            config.lateral.cornering_coefficient,
        )?,
    };

    Ok(TireParameters {
        dynamic_radius: Vector4::from(config.dynamic_radius),
        longitudinal,
        lateral,
        rolling_resistance_coefficient: ensure_finite(
            "tire.rolling_resistance_coefficient",
            config.rolling_resistance_coefficient,
        )?,
        inertia: ensure_positive("tire.inertia", config.inertia)?,
    })
}

fn build_powertrain(config: &PowertrainConfig) -> Result<PowertrainParameters, ConfigError> {
    for &share in &config.bias {
        ensure_finite("powertrain.bias", share)?;
    }

    let engine = &config.engine;
    let torque_curve = LookupTable::new(
        "powertrain.engine.torque_max",
        engine.w_table.iter().map(|rpm| rpm * RPM_TO_RAD_PER_SEC).collect(),
        engine.torque_max.clone(),
    )?;
    let engine = EngineParameters {
        torque_curve,
        idle_w: ensure_positive("powertrain.engine.idle_rpm", engine.idle_rpm)?
            * RPM_TO_RAD_PER_SEC,
        maximum_w: ensure_positive("powertrain.engine.maximum_rpm", engine.maximum_rpm)?
            * RPM_TO_RAD_PER_SEC,
        inertia: ensure_positive("powertrain.engine.inertia", engine.inertia)?,
    };
    if engine.maximum_w <= engine.idle_w {
        return Err(ConfigError::NonPositive {
            field: "powertrain.engine.maximum_rpm - idle_rpm",
            value: (engine.maximum_w - engine.idle_w) / RPM_TO_RAD_PER_SEC,
        });
    }

    let gearbox = build_gearbox(&config.gearbox)?;

    let differential = config.differential;
    ensure_positive("powertrain.differential.ratio", differential.ratio)?;
    ensure_finite(
        "powertrain.differential.driveshaft_inertia",
        differential.driveshaft_inertia,
    )?;

    let converter = build_converter(&config.torque_converter)?;

    Ok(PowertrainParameters {
        bias: Vector4::from(config.bias),
        engine,
        gearbox,
        differential,
        converter,
    })
}

fn build_brake(config: &BrakeConfig) -> Result<BrakeParameters, ConfigError> {
    for &share in &config.brake_bias {
        ensure_finite("brake.brake_bias", share)?;
    }
    Ok(BrakeParameters {
        max_braking_torque: ensure_positive(
            "brake.max_braking_torque",
            config.max_braking_torque,
        )?,
        brake_bias: Vector4::from(config.brake_bias),
    })
}

fn build_gearbox(config: &GearboxConfig) -> Result<GearboxParameters, ConfigError> {
    if config.gear_ratio.len() < 2 {
        return Err(ConfigError::NoDriveGears);
    }
    for &ratio in &config.gear_ratio[1..] {
        ensure_positive("powertrain.gearbox.gear_ratio", ratio)?;
    }

    let max_w = shift_table("powertrain.gearbox.gear_max_rpm", &config.gear_max_rpm, config.gear_ratio.len())?;
    let min_w = shift_table("powertrain.gearbox.gear_min_rpm", &config.gear_min_rpm, config.gear_ratio.len())?;

    Ok(GearboxParameters {
        ratios: config.gear_ratio.clone(),
        max_w,
        min_w,
        efficiency: ensure_positive("powertrain.gearbox.efficiency", config.efficiency)?,
        inertia: ensure_finite("powertrain.gearbox.inertia", config.inertia)?,
        min_shift_interval: config.min_gear_change_interval,
    })
}

fn shift_table(
    table: &'static str,
    rows: &[Vec<f64>],
    gears: usize,
) -> Result<Vec<Vec<f64>>, ConfigError> {
    if rows.len() != THROTTLE_BUCKETS {
        return Err(ConfigError::TableLength {
            table,
            expected: THROTTLE_BUCKETS,
            actual: rows.len(),
        });
    }
    rows.iter()
        .map(|row| {
            if row.len() != gears {
                return Err(ConfigError::TableLength {
                    table,
                    expected: gears,
                    actual: row.len(),
                });
            }
            row.iter()
                .map(|&rpm| ensure_finite(table, rpm).map(|rpm| rpm * RPM_TO_RAD_PER_SEC))
                .collect()
        })
        .collect()
}

fn build_converter(
    config: &TorqueConverterConfig,
) -> Result<TorqueConverterParameters, ConfigError> {
    let lock_up_ratio = config.lock_up_ratio;
    if !(lock_up_ratio > 0.0 && lock_up_ratio <= 1.0) {
        return Err(ConfigError::LockUpRatio(lock_up_ratio));
    }

    let torque_ratio = LookupTable::new(
        "powertrain.torque_converter.ratio",
        config.speed_ratio.clone(),
        config.ratio.clone(),
    )?;
    if !torque_ratio.covers(0.0, lock_up_ratio) {
        return Err(ConfigError::ConverterDomain {
            table: torque_ratio.name(),
            lock_up_ratio,
        });
    }

    let capacity_factor = LookupTable::evenly_spaced(
        "powertrain.torque_converter.factor",
        0.0,
        1.0,
        config.factor.clone(),
    )?;

    Ok(TorqueConverterParameters {
        torque_ratio,
        capacity_factor,
        lock_up_ratio,
        sync_ticks: config.converter_sync_time,
    })
}
