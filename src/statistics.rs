//! Request, tick and failure counters for a running connector.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::ConnectorError;

/// Class of a failed data exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The simulator could not be reached or the socket failed.
    Connection,
    /// The simulator accepted the request but sent nothing back.
    NoReply,
    /// The reply arrived but its HTTP framing was unusable.
    Framing,
    /// The simulator answered with a SOAP fault.
    SoapFault,
    /// The reply body lacked a telemetry field or held an unparsable one.
    Telemetry,
}

impl FailureKind {
    const COUNT: usize = 5;

    pub fn of(error: &ConnectorError) -> FailureKind {
        match error {
            ConnectorError::ConnectFailed { .. } | ConnectorError::Io(_) => FailureKind::Connection,
            ConnectorError::NoReply => FailureKind::NoReply,
            ConnectorError::MissingLengthHeader
            | ConnectorError::MissingBodySeparator
            | ConnectorError::ReplyTooLarge { .. }
            | ConnectorError::IncompleteBody { .. } => FailureKind::Framing,
            ConnectorError::SoapFault(_) => FailureKind::SoapFault,
            ConnectorError::MissingKey(_) | ConnectorError::MalformedValue { .. } => {
                FailureKind::Telemetry
            }
        }
    }
}

/// Failed exchanges, per [`FailureKind`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FailureCounts {
    pub connection: u32,
    pub no_reply: u32,
    pub framing: u32,
    pub soap_fault: u32,
    pub telemetry: u32,
}

impl FailureCounts {
    pub fn get(&self, kind: FailureKind) -> u32 {
        match kind {
            FailureKind::Connection => self.connection,
            FailureKind::NoReply => self.no_reply,
            FailureKind::Framing => self.framing,
            FailureKind::SoapFault => self.soap_fault,
            FailureKind::Telemetry => self.telemetry,
        }
    }

    pub fn total(&self) -> u32 {
        self.connection
            .wrapping_add(self.no_reply)
            .wrapping_add(self.framing)
            .wrapping_add(self.soap_fault)
            .wrapping_add(self.telemetry)
    }
}

/// Snapshot of the counters of a running [`FlightAxis`](crate::FlightAxis).
///
/// Only data exchanges are counted as ticks or failures. Handshake requests
/// show up in `request_count` alone.
///
/// ```no_run
/// use flightaxis_connector::{ActuatorFrame, FlightAxis};
///
/// let mut axis = FlightAxis::new();
/// for _ in 0..1000 {
///     let _ = axis.update(&ActuatorFrame::splat(1500));
/// }
///
/// let stats = axis.statistics();
/// println!("{} of 1000 ticks completed at {:.1} Hz", stats.tick_count, stats.frequency);
/// println!("no reply: {}, bad framing: {}", stats.failures.no_reply, stats.failures.framing);
/// ```
#[derive(Debug)]
pub struct Statistics {
    /// Time since the connector was created.
    pub runtime: Duration,
    /// SOAP requests written to a connected socket. Wraps after `u32::MAX`.
    pub request_count: u32,
    /// Exchanges that produced fresh telemetry.
    pub tick_count: u32,
    /// Failed exchanges of any kind.
    pub error_count: u32,
    pub failures: FailureCounts,
    /// Completed ticks per second of runtime.
    pub frequency: f32,
}

/// Shared counters updated by the SOAP client and the connector.
pub(crate) struct StatisticsEngine {
    start_time: Instant,
    request_count: AtomicU32,
    tick_count: AtomicU32,
    failures: [AtomicU32; FailureKind::COUNT],
}

impl StatisticsEngine {
    pub fn new() -> Self {
        StatisticsEngine {
            start_time: Instant::now(),
            request_count: AtomicU32::new(0),
            tick_count: AtomicU32::new(0),
            failures: Default::default(),
        }
    }

    pub fn snapshot(&self) -> Statistics {
        let runtime = self.start_time.elapsed();
        let tick_count = self.tick_count.load(Ordering::Relaxed);
        let failures = FailureCounts {
            connection: self.failures_of(FailureKind::Connection),
            no_reply: self.failures_of(FailureKind::NoReply),
            framing: self.failures_of(FailureKind::Framing),
            soap_fault: self.failures_of(FailureKind::SoapFault),
            telemetry: self.failures_of(FailureKind::Telemetry),
        };

        Statistics {
            runtime,
            request_count: self.request_count.load(Ordering::Relaxed),
            tick_count,
            error_count: failures.total(),
            failures,
            frequency: per_second(tick_count, runtime),
        }
    }

    pub(crate) fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tick(&self) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, error: &ConnectorError) {
        self.failures[FailureKind::of(error) as usize].fetch_add(1, Ordering::Relaxed);
    }

    fn failures_of(&self, kind: FailureKind) -> u32 {
        self.failures[kind as usize].load(Ordering::Relaxed)
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn per_second(count: u32, elapsed: Duration) -> f32 {
    let seconds = elapsed.as_secs_f32();
    if seconds > 0.0 {
        count as f32 / seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn every_error() -> Vec<(ConnectorError, FailureKind)> {
        vec![
            (
                ConnectorError::ConnectFailed {
                    host: "127.0.0.1:18083".to_string(),
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                },
                FailureKind::Connection,
            ),
            (
                ConnectorError::Io(io::Error::from(io::ErrorKind::BrokenPipe)),
                FailureKind::Connection,
            ),
            (ConnectorError::NoReply, FailureKind::NoReply),
            (ConnectorError::MissingLengthHeader, FailureKind::Framing),
            (ConnectorError::MissingBodySeparator, FailureKind::Framing),
            (
                ConnectorError::ReplyTooLarge {
                    expected: 20_000,
                    capacity: 10_000,
                },
                FailureKind::Framing,
            ),
            (
                ConnectorError::IncompleteBody {
                    received: 10,
                    expected: 20,
                },
                FailureKind::Framing,
            ),
            (
                ConnectorError::SoapFault("Preempted by a higher priority request".to_string()),
                FailureKind::SoapFault,
            ),
            (ConnectorError::MissingKey("m-roll-DEG"), FailureKind::Telemetry),
            (
                ConnectorError::MalformedValue {
                    key: "m-propRPM",
                    value: "fast".to_string(),
                },
                FailureKind::Telemetry,
            ),
        ]
    }

    #[test]
    fn every_error_has_a_kind() {
        for (error, kind) in every_error() {
            assert_eq!(FailureKind::of(&error), kind, "{:?}", error);
        }
    }

    #[test]
    fn fresh_engine_reports_nothing() {
        let snapshot = StatisticsEngine::default().snapshot();

        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.tick_count, 0);
        assert_eq!(snapshot.error_count, 0);
        assert_eq!(snapshot.failures, FailureCounts::default());
    }

    #[test]
    fn failures_are_counted_per_kind() {
        let engine = StatisticsEngine::new();

        engine.record_failure(&ConnectorError::NoReply);
        engine.record_failure(&ConnectorError::NoReply);
        engine.record_failure(&ConnectorError::MissingKey("m-airspeed-MPS"));
        engine.record_failure(&ConnectorError::MissingLengthHeader);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.failures.get(FailureKind::NoReply), 2);
        assert_eq!(snapshot.failures.get(FailureKind::Telemetry), 1);
        assert_eq!(snapshot.failures.get(FailureKind::Framing), 1);
        assert_eq!(snapshot.failures.get(FailureKind::Connection), 0);
        assert_eq!(snapshot.failures.get(FailureKind::SoapFault), 0);
        assert_eq!(snapshot.error_count, 4);
    }

    #[test]
    fn every_kind_lands_in_its_own_counter() {
        let engine = StatisticsEngine::new();
        for (error, _) in every_error() {
            engine.record_failure(&error);
        }

        let failures = engine.snapshot().failures;
        assert_eq!(
            failures,
            FailureCounts {
                connection: 2,
                no_reply: 1,
                framing: 4,
                soap_fault: 1,
                telemetry: 2,
            }
        );
        assert_eq!(failures.total(), 10);
    }

    #[test]
    fn requests_and_ticks_are_separate() {
        let engine = StatisticsEngine::new();

        engine.record_request();
        engine.record_request();
        engine.record_request();
        engine.record_tick();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.request_count, 3);
        assert_eq!(snapshot.tick_count, 1);
        assert_eq!(snapshot.error_count, 0);
    }

    #[test]
    fn frequency_follows_completed_ticks() {
        assert_eq!(per_second(500, Duration::from_secs(2)), 250.0);
        assert_eq!(per_second(0, Duration::from_secs(1)), 0.0);
        assert_eq!(per_second(10, Duration::ZERO), 0.0);
    }
}
