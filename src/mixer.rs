//! Actuator mixing from harness servo outputs to FlightAxis control channels.
//!
//! Raw servo pulse widths are normalized into `[0, 1]` and then passed through
//! the transforms of the selected [`Airframe`], in order.

use serde::{Deserialize, Serialize};

/// Number of control channels exchanged with the simulator.
pub const NUM_CHANNELS: usize = 8;

const SERVO_MIN_PWM: f32 = 1000.0;
const SERVO_RANGE_PWM: f32 = 1000.0;

/// Raw actuator outputs for one tick, as servo pulse widths in microseconds.
///
/// The nominal range is 1000 to 2000; values outside it are clamped when
/// normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorFrame(pub [u16; NUM_CHANNELS]);

impl ActuatorFrame {
    /// Frame with every channel set to `pwm`.
    pub fn splat(pwm: u16) -> Self {
        ActuatorFrame([pwm; NUM_CHANNELS])
    }

    /// Channels scaled into `[0, 1]`.
    pub fn normalized(&self) -> ControlChannels {
        let mut channels = [0.0f32; NUM_CHANNELS];
        for (channel, pwm) in channels.iter_mut().zip(self.0.iter()) {
            *channel = ((*pwm as f32 - SERVO_MIN_PWM) / SERVO_RANGE_PWM).clamp(0.0, 1.0);
        }
        ControlChannels(channels)
    }
}

impl From<[u16; NUM_CHANNELS]> for ActuatorFrame {
    fn from(values: [u16; NUM_CHANNELS]) -> Self {
        ActuatorFrame(values)
    }
}

/// Normalized control channel values sent to the simulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlChannels(pub [f32; NUM_CHANNELS]);

/// One step of the airframe specific channel mapping.
pub trait ChannelTransform {
    fn apply(&self, channels: &mut [f32; NUM_CHANNELS]);
}

/// Exchanges the first and last four channels as a block.
///
/// Used for quadplanes whose lift motors sit on the upper outputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwapHalves;

impl ChannelTransform for SwapHalves {
    fn apply(&self, channels: &mut [f32; NUM_CHANNELS]) {
        let (low, high) = channels.split_at_mut(NUM_CHANNELS / 2);
        low.swap_with_slice(high);
    }
}

/// Converts three swashplate servos into the roll and pitch inputs
/// FlightAxis expects for helicopters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwashplateDemix;

impl ChannelTransform for SwashplateDemix {
    fn apply(&self, channels: &mut [f32; NUM_CHANNELS]) {
        let [swash1, swash2, swash3] = [channels[0], channels[1], channels[2]];

        let roll = swash1 - swash2;
        let pitch = -((swash1 + swash2) / 2.0 - swash3);

        channels[0] = (roll + 0.5).clamp(0.0, 1.0);
        channels[1] = (pitch + 0.5).clamp(0.0, 1.0);
    }
}

const REV4_TRANSFORMS: &[&dyn ChannelTransform] = &[&SwapHalves];
const HELICOPTER_TRANSFORMS: &[&dyn ChannelTransform] = &[&SwashplateDemix];
const REV4_HELICOPTER_TRANSFORMS: &[&dyn ChannelTransform] = &[&SwapHalves, &SwashplateDemix];

/// Which propulsion RPM the simulator reports for an airframe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpmSource {
    MainRotor,
    Propeller,
}

/// Airframe variant, chosen once when the connector is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Airframe {
    #[default]
    Conventional,
    /// First and last four channels swapped.
    Rev4,
    /// Swashplate demixed into roll and pitch.
    Helicopter,
    Rev4Helicopter,
}

impl Airframe {
    /// Picks the variant from a harness frame name such as `"heli"` or
    /// `"quadplane-rev4"`.
    pub fn from_frame_name(name: &str) -> Self {
        match (name.contains("rev4"), name.contains("heli")) {
            (false, false) => Airframe::Conventional,
            (true, false) => Airframe::Rev4,
            (false, true) => Airframe::Helicopter,
            (true, true) => Airframe::Rev4Helicopter,
        }
    }

    /// Transforms applied after normalization, in order.
    pub fn transforms(&self) -> &'static [&'static dyn ChannelTransform] {
        match self {
            Airframe::Conventional => &[],
            Airframe::Rev4 => REV4_TRANSFORMS,
            Airframe::Helicopter => HELICOPTER_TRANSFORMS,
            Airframe::Rev4Helicopter => REV4_HELICOPTER_TRANSFORMS,
        }
    }

    pub fn is_helicopter(&self) -> bool {
        matches!(self, Airframe::Helicopter | Airframe::Rev4Helicopter)
    }

    pub fn rpm_source(&self) -> RpmSource {
        if self.is_helicopter() {
            RpmSource::MainRotor
        } else {
            RpmSource::Propeller
        }
    }

    /// Map raw actuator outputs to control channels. Every output lies in `[0, 1]`.
    pub fn mix(&self, frame: &ActuatorFrame) -> ControlChannels {
        let mut channels = frame.normalized();
        for transform in self.transforms() {
            transform.apply(&mut channels.0);
        }
        channels
    }
}
