//! FlightAxisConnector couples a flight-control simulation harness to RealFlight through its
//! FlightAxis (RealFlight Link) SOAP interface.
//!
//! Once per simulation tick the connector:
//!
//! * mixes the harness's raw actuator outputs into RealFlight's normalized control channels,
//! * posts them to the simulator and waits (bounded) for the length-framed telemetry reply,
//! * translates the reply into a standard aircraft state: attitude, body rates, world-frame
//!   velocity and position, and body-frame acceleration derived from the velocity change.
//!
//! ```no_run
//! use flightaxis_connector::{ActuatorFrame, Airframe, Configuration, FlightAxis};
//!
//! fn main() -> Result<(), flightaxis_connector::ConnectorError> {
//!     let configuration = Configuration {
//!         airframe: Airframe::from_frame_name("heli"),
//!         ..Default::default()
//!     };
//!     let mut axis = FlightAxis::with_configuration(&configuration);
//!
//!     let frame = ActuatorFrame::splat(1500);
//!     let state = axis.update(&frame)?;
//!     println!("position: {:?}", state.position);
//!     Ok(())
//! }
//! ```

use std::io;

use thiserror::Error;

pub(crate) use statistics::StatisticsEngine;

pub use connector::{Configuration, FlightAxis, Session, validate_speedup};
pub use decoders::{ReplyFields, TELEMETRY_KEYS, TelemetryRecord, decode_telemetry, extract_fields};
pub use mixer::{
    ActuatorFrame, Airframe, ChannelTransform, ControlChannels, NUM_CHANNELS, RpmSource,
    SwapHalves, SwashplateDemix,
};
pub use state::{GRAVITY_MSS, StandardState, StateTranslator, world_acceleration};
pub use statistics::{FailureCounts, FailureKind, Statistics};
pub use timing::{FrameClock, FrameReport, REPORT_INTERVAL_FRAMES};

mod connector;
mod decoders;
mod encoders;
mod mixer;
pub(crate) mod soap_client;
mod state;
mod statistics;
mod timing;

/// Default address of the FlightAxis SOAP server.
pub const DEFAULT_SIMULATOR_HOST: &str = "127.0.0.1:18083";

/// Errors raised while exchanging data with the simulator.
///
/// Every variant is recoverable at tick granularity: the connector keeps the
/// previous tick's telemetry and state, and the harness decides whether to
/// keep ticking or give up.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("failed to connect to simulator at {host}: {source}")]
    ConnectFailed {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("no data received from simulator")]
    NoReply,
    #[error("reply has no Content-Length header")]
    MissingLengthHeader,
    #[error("reply has no header/body separator")]
    MissingBodySeparator,
    #[error("reply too large: {expected} bytes exceeds capacity of {capacity}")]
    ReplyTooLarge { expected: usize, capacity: usize },
    #[error("incomplete reply body: received {received} of {expected} bytes")]
    IncompleteBody { received: usize, expected: usize },
    #[error("telemetry key {0} not found in reply")]
    MissingKey(&'static str),
    #[error("telemetry key {key} has malformed value '{value}'")]
    MalformedValue { key: &'static str, value: String },
    #[error("{0}")]
    SoapFault(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Configuration values the connector cannot run with.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("speedup must be positive and finite, got {0}")]
    InvalidSpeedup(f64),
    #[error("gravity must be finite, got {0}")]
    InvalidGravity(f64),
    #[error("reply capacity must be nonzero")]
    ZeroReplyCapacity,
}

#[cfg(test)]
mod tests;
