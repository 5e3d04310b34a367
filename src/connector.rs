use std::{sync::Arc, time::Duration, time::Instant};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::decoders::decode_telemetry;
use crate::encoders::encode_control_inputs;
use crate::soap_client::{SoapClient, tcp::TcpSoapClient};
use crate::{
    ActuatorFrame, Airframe, ConfigurationError, ConnectorError, DEFAULT_SIMULATOR_HOST,
    FrameClock, GRAVITY_MSS, StandardState, StateTranslator, Statistics, StatisticsEngine,
    TelemetryRecord,
};

#[cfg(test)]
use crate::soap_client::stub::StubSoapClient;

const EMPTY_BODY: &str = "";

/// Loop rate the simulator sustains at real time, in Hz.
const BASE_RATE_HZ: f64 = 250.0;

/// Whether the simulator has been handed over to the external controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Session {
    /// The simulator is flying from its own RC input. The next exchange
    /// performs the handshake first.
    #[default]
    Detached,
    Established,
}

/// Couples a simulation harness to RealFlight through FlightAxis.
///
/// # Overview
///
/// Each call to [`update`](FlightAxis::update) is one simulation tick:
///
/// - On the first tick (and after [`reset_session`](FlightAxis::reset_session))
///   the simulator is switched over to the external controller interface.
/// - The actuator frame is mixed for the configured [`Airframe`] and sent.
/// - The telemetry reply is decoded and translated into a [`StandardState`].
///
/// # Examples
///
/// ```no_run
/// use flightaxis_connector::{ActuatorFrame, FlightAxis};
///
/// fn main() -> Result<(), flightaxis_connector::ConnectorError> {
///     let mut axis = FlightAxis::new();
///
///     let mut frame = ActuatorFrame::splat(1500);
///     frame.0[2] = 1000; // throttle closed
///
///     for _ in 0..250 {
///         let state = axis.update(&frame)?;
///         println!("altitude: {:.2}", -state.position.z);
///     }
///
///     axis.release_control()?;
///     Ok(())
/// }
/// ```
///
/// # Error Handling
///
/// A failed tick returns the error and leaves [`telemetry`](FlightAxis::telemetry)
/// and [`state`](FlightAxis::state) exactly as the last successful tick left them.
/// Simulated time is not advanced either, so the next successful tick spans the gap.
/// The harness decides whether to keep ticking or give up.
///
/// # Statistics
///
/// Use [`statistics()`](FlightAxis::statistics) to retrieve request and tick counts,
/// failures by [`FailureKind`](crate::FailureKind) and the average tick rate.
pub struct FlightAxis {
    configuration: Configuration,
    statistics: Arc<StatisticsEngine>,
    soap_client: Box<dyn SoapClient>,
    session: Session,
    translator: StateTranslator,
    clock: FrameClock,
    telemetry: TelemetryRecord,
    state: StandardState,
}

impl FlightAxis {
    /// Creates a connector for a simulator on the local machine with the
    /// default [`Configuration`].
    ///
    /// No connection is made until the first tick.
    pub fn new() -> FlightAxis {
        FlightAxis::with_configuration(&Configuration::default())
    }

    /// Creates a connector using the given [`Configuration`].
    ///
    /// ```no_run
    /// use flightaxis_connector::{Airframe, Configuration, FlightAxis};
    ///
    /// let configuration = Configuration {
    ///     simulator_host: "192.168.1.100:18083".to_string(),
    ///     airframe: Airframe::from_frame_name("heli"),
    ///     ..Default::default()
    /// };
    /// let axis = FlightAxis::with_configuration(&configuration);
    /// ```
    pub fn with_configuration(configuration: &Configuration) -> FlightAxis {
        let statistics = Arc::new(StatisticsEngine::new());
        let soap_client = TcpSoapClient::new(configuration, statistics.clone());
        FlightAxis::from_parts(configuration, statistics, Box::new(soap_client))
    }

    fn from_parts(
        configuration: &Configuration,
        statistics: Arc<StatisticsEngine>,
        soap_client: Box<dyn SoapClient>,
    ) -> FlightAxis {
        FlightAxis {
            configuration: configuration.clone(),
            statistics,
            soap_client,
            session: Session::Detached,
            translator: StateTranslator::new(
                configuration.airframe,
                configuration.speedup,
                configuration.gravity,
            ),
            clock: FrameClock::new(configuration.speedup),
            telemetry: TelemetryRecord::default(),
            state: StandardState::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn stub(
        configuration: &Configuration,
        mut soap_client: StubSoapClient,
    ) -> FlightAxis {
        let statistics = Arc::new(StatisticsEngine::new());
        soap_client.statistics = Some(statistics.clone());
        FlightAxis::from_parts(configuration, statistics, Box::new(soap_client))
    }

    #[cfg(test)]
    pub(crate) fn requests(&self) -> Vec<String> {
        self.soap_client.requests()
    }

    /// Runs one tick: exchanges `frame` for fresh telemetry and translates it.
    pub fn update(&mut self, frame: &ActuatorFrame) -> Result<&StandardState, ConnectorError> {
        self.exchange(frame)?;
        Ok(self.advance(Instant::now()))
    }

    /// Like [`update`](FlightAxis::update), with the tick's wall-clock time supplied.
    pub fn update_at(
        &mut self,
        frame: &ActuatorFrame,
        now: Instant,
    ) -> Result<&StandardState, ConnectorError> {
        self.exchange(frame)?;
        Ok(self.advance(now))
    }

    /// Sends `frame` to the simulator and stores the telemetry it returns,
    /// without translating it.
    ///
    /// Performs the session handshake first when the session is detached.
    pub fn exchange(&mut self, frame: &ActuatorFrame) -> Result<TelemetryRecord, ConnectorError> {
        if self.session == Session::Detached {
            self.establish_session();
        }

        let channels = self.configuration.airframe.mix(frame);
        let body = encode_control_inputs(&channels);

        let telemetry = self
            .soap_client
            .send_action("ExchangeData", &body)
            .and_then(|response| response.into_body())
            .and_then(|body| decode_telemetry(&body))
            .inspect_err(|e| {
                self.statistics.record_failure(e);
                warn!("Data exchange failed, keeping previous state: {}", e);
            })?;

        self.statistics.record_tick();
        self.telemetry = telemetry;
        Ok(telemetry)
    }

    fn advance(&mut self, now: Instant) -> &StandardState {
        let dt_seconds = self.clock.advance(now);

        let mut state = self
            .translator
            .translate(&self.telemetry, &self.state, dt_seconds);
        state.time_now_us = self.clock.time_now_us();
        self.state = state;

        if let Some(report) = self.clock.checkpoint(&self.state.position) {
            info!("{}", report);
        }
        &self.state
    }

    /// Hands the simulator over to the external controller.
    ///
    /// Restores the original controller device, then injects the UAV
    /// controller interface. Failures are logged; the session is marked
    /// established either way.
    pub fn establish_session(&mut self) {
        for action in ["RestoreOriginalControllerDevice", "InjectUAVControllerInterface"] {
            let result: Result<(), ConnectorError> = self
                .soap_client
                .send_action(action, EMPTY_BODY)
                .and_then(|response| response.into());
            if let Err(e) = result {
                warn!("{} failed: {}", action, e);
            }
        }

        info!("Controller interface injected");
        self.session = Session::Established;
    }

    /// Forgets the handshake so the next exchange performs it again,
    /// e.g. after the simulator has been restarted.
    pub fn reset_session(&mut self) {
        self.session = Session::Detached;
    }

    /// Returns control to the simulator's own RC input.
    ///
    /// On success the session becomes detached, so a later tick takes control again.
    pub fn release_control(&mut self) -> Result<(), ConnectorError> {
        let result: Result<(), ConnectorError> = self
            .soap_client
            .send_action("RestoreOriginalControllerDevice", EMPTY_BODY)?
            .into();
        result?;

        info!("Original controller device restored");
        self.session = Session::Detached;
        Ok(())
    }

    /// Resets the aircraft to its starting position, like pressing the
    /// spacebar in RealFlight.
    pub fn reset_aircraft(&self) -> Result<(), ConnectorError> {
        self.soap_client
            .send_action("ResetAircraft", EMPTY_BODY)?
            .into()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Telemetry from the last successful exchange.
    pub fn telemetry(&self) -> &TelemetryRecord {
        &self.telemetry
    }

    /// State from the last successful tick.
    pub fn state(&self) -> &StandardState {
        &self.state
    }

    pub fn airframe(&self) -> Airframe {
        self.configuration.airframe
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Get statistics for the connector
    pub fn statistics(&self) -> Statistics {
        self.statistics.snapshot()
    }
}

impl Default for FlightAxis {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration settings for the FlightAxis connector.
///
/// # Default Configuration
///
/// ```rust
/// use flightaxis_connector::{Airframe, Configuration, GRAVITY_MSS};
/// use std::time::Duration;
///
/// let default_config = Configuration {
///     simulator_host: "127.0.0.1:18083".to_string(),
///     connect_timeout: Duration::from_millis(50),
///     first_read_timeout: Duration::from_millis(1000),
///     read_timeout: Duration::from_millis(100),
///     reply_capacity: 10_000,
///     speedup: 1.0,
///     gravity: GRAVITY_MSS,
///     airframe: Airframe::Conventional,
/// };
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    /// Address of the FlightAxis server, as "host:port".
    pub simulator_host: String,

    /// Maximum time to wait when establishing the connection for a request.
    pub connect_timeout: Duration,

    /// How long to wait for the first bytes of a reply.
    pub first_read_timeout: Duration,

    /// How long to wait for each further part of a reply body.
    pub read_timeout: Duration,

    /// Receive buffer size in bytes. Replies must fit inside it, headers included.
    pub reply_capacity: usize,

    /// Time acceleration factor: simulated seconds per wall-clock second.
    pub speedup: f64,

    /// Gravity removed from the derived acceleration, in m/s².
    pub gravity: f64,

    pub airframe: Airframe,
}

impl Configuration {
    /// Nominal tick rate the harness should run at.
    ///
    /// Finite and positive for any configuration that passes
    /// [`validate`](Configuration::validate).
    pub fn rate_hz(&self) -> f64 {
        BASE_RATE_HZ / self.speedup
    }

    /// Checks the values the tick pipeline divides by or scales with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_speedup(self.speedup)?;
        if !self.gravity.is_finite() {
            return Err(ConfigurationError::InvalidGravity(self.gravity));
        }
        if self.reply_capacity == 0 {
            return Err(ConfigurationError::ZeroReplyCapacity);
        }
        Ok(())
    }
}

/// Accepts a speedup factor only if it is positive and finite.
pub fn validate_speedup(speedup: f64) -> Result<f64, ConfigurationError> {
    if speedup.is_finite() && speedup > 0.0 {
        Ok(speedup)
    } else {
        Err(ConfigurationError::InvalidSpeedup(speedup))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            simulator_host: DEFAULT_SIMULATOR_HOST.to_string(),
            connect_timeout: Duration::from_millis(50),
            first_read_timeout: Duration::from_millis(1000),
            read_timeout: Duration::from_millis(100),
            reply_capacity: 10_000,
            speedup: 1.0,
            gravity: GRAVITY_MSS,
            airframe: Airframe::Conventional,
        }
    }
}
