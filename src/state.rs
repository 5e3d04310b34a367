//! Translation of FlightAxis telemetry into the harness's aircraft state.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Airframe, RpmSource, TelemetryRecord};

/// Standard gravity in m/s².
pub const GRAVITY_MSS: f64 = 9.80665;

/// Body rates reported by the simulator are clamped to this magnitude, in deg/s.
const MAX_RATE_DEG_PER_SEC: f64 = 2000.0;

/// Derived body accelerations are clamped to this magnitude, in m/s².
const MAX_ACCEL_MSS: f64 = 16.0;

/// Aircraft state in the harness convention: north-east-down world frame,
/// forward-right-down body frame, SI units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardState {
    /// Body to world rotation.
    pub orientation: Rotation3<f64>,
    /// Body rates in rad/s.
    pub gyro: Vector3<f64>,
    /// World frame velocity in m/s.
    pub velocity_ef: Vector3<f64>,
    /// World frame position in metres relative to the first sample.
    pub position: Vector3<f64>,
    /// Body frame specific force in m/s².
    pub accel_body: Vector3<f64>,
    pub airspeed: f64,
    pub battery_voltage: f64,
    pub battery_current: f64,
    pub rpm: f64,
    /// Simulated time since the first tick, in microseconds.
    pub time_now_us: u64,
}

impl Default for StandardState {
    fn default() -> Self {
        StandardState {
            orientation: Rotation3::identity(),
            gyro: Vector3::zeros(),
            velocity_ef: Vector3::zeros(),
            position: Vector3::zeros(),
            accel_body: Vector3::zeros(),
            airspeed: 0.0,
            battery_voltage: 0.0,
            battery_current: 0.0,
            rpm: 0.0,
            time_now_us: 0,
        }
    }
}

/// World frame acceleration from two velocity samples, with gravity removed
/// from the down axis.
///
/// When `dt_seconds` is not a positive finite number the velocity change is
/// ignored and only gravity remains.
pub fn world_acceleration(
    previous: &Vector3<f64>,
    current: &Vector3<f64>,
    dt_seconds: f64,
    gravity: f64,
) -> Vector3<f64> {
    let mut accel = if dt_seconds > 0.0 && dt_seconds.is_finite() {
        (current - previous) / dt_seconds
    } else {
        Vector3::zeros()
    };
    accel.z -= gravity;
    accel
}

/// Converts telemetry records into [`StandardState`]s.
///
/// Holds the position origin, captured from the first record translated.
#[derive(Clone, Debug)]
pub struct StateTranslator {
    airframe: Airframe,
    speedup: f64,
    gravity: f64,
    position_offset: Option<Vector3<f64>>,
}

impl StateTranslator {
    pub fn new(airframe: Airframe, speedup: f64, gravity: f64) -> Self {
        StateTranslator {
            airframe,
            speedup,
            gravity,
            position_offset: None,
        }
    }

    /// Position of the first translated record, in the world frame.
    pub fn position_offset(&self) -> Option<Vector3<f64>> {
        self.position_offset
    }

    /// Build the state for `telemetry`. `previous` supplies the velocity the
    /// acceleration is differenced against; its `time_now_us` is carried over.
    pub fn translate(
        &mut self,
        telemetry: &TelemetryRecord,
        previous: &StandardState,
        dt_seconds: f64,
    ) -> StandardState {
        let orientation = Rotation3::from_euler_angles(
            telemetry.roll_deg.to_radians(),
            telemetry.inclination_deg.to_radians(),
            -telemetry.azimuth_deg.to_radians(),
        );

        let gyro = Vector3::new(
            clamp_rate(telemetry.roll_rate_deg_per_sec),
            clamp_rate(telemetry.pitch_rate_deg_per_sec),
            -clamp_rate(telemetry.yaw_rate_deg_per_sec),
        ) * self.speedup;

        let velocity_ef = Vector3::new(
            telemetry.velocity_world_u_mps,
            telemetry.velocity_world_v_mps,
            telemetry.velocity_world_w_mps,
        );

        let raw_position = Vector3::new(
            telemetry.position_y_m,
            telemetry.position_x_m,
            -telemetry.altitude_agl_m,
        );
        let offset = *self.position_offset.get_or_insert(raw_position);

        let accel_ef =
            world_acceleration(&previous.velocity_ef, &velocity_ef, dt_seconds, self.gravity);
        let accel_body = orientation
            .inverse_transform_vector(&accel_ef)
            .map(|a| a.clamp(-MAX_ACCEL_MSS, MAX_ACCEL_MSS));

        let rpm = match self.airframe.rpm_source() {
            RpmSource::MainRotor => telemetry.heli_main_rotor_rpm,
            RpmSource::Propeller => telemetry.prop_rpm,
        };

        StandardState {
            orientation,
            gyro,
            velocity_ef,
            position: raw_position - offset,
            accel_body,
            airspeed: telemetry.airspeed_mps,
            battery_voltage: telemetry.battery_voltage,
            battery_current: telemetry.battery_current_draw,
            rpm,
            time_now_us: previous.time_now_us,
        }
    }
}

fn clamp_rate(deg_per_sec: f64) -> f64 {
    deg_per_sec
        .clamp(-MAX_RATE_DEG_PER_SEC, MAX_RATE_DEG_PER_SEC)
        .to_radians()
}
