//! Provides an implementation of a SOAP client that uses the TCP protocol.
//!
//! The FlightAxis server expects a new connection for each request, so every
//! action opens its own stream and drops it before returning.

use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use log::{debug, error};

use super::xml::{build_http_request, create_response, parse_reply_frame};
use super::{SoapClient, SoapResponse, encode_envelope};
use crate::{Configuration, ConnectorError, StatisticsEngine};

/// Socket timeouts of zero mean "block forever" to the OS, never use them.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Byte-level primitives the SOAP client needs from a connection.
pub(crate) trait Transport {
    /// Send the whole buffer.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receive into `buf`, waiting at most `timeout`. A timeout surfaces as an error.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

impl Transport for TcpStream {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)?;
        self.flush()
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        self.read(buf)
    }
}

/// Bounds applied while receiving a reply.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReceiveLimits {
    /// Receive buffer size. A reply must fit strictly inside it, headers included.
    pub capacity: usize,
    pub first_read_timeout: Duration,
    pub read_timeout: Duration,
}

impl From<&Configuration> for ReceiveLimits {
    fn from(configuration: &Configuration) -> Self {
        ReceiveLimits {
            capacity: configuration.reply_capacity,
            first_read_timeout: configuration.first_read_timeout,
            read_timeout: configuration.read_timeout,
        }
    }
}

/// Receive one length-framed reply.
///
/// The first read must carry the complete header block. Continuation reads
/// append to the buffer until the declared body length has arrived; nothing
/// is returned unless the whole reply was received.
pub(crate) fn receive_reply<T: Transport + ?Sized>(
    transport: &mut T,
    limits: &ReceiveLimits,
) -> Result<SoapResponse, ConnectorError> {
    let mut buffer = vec![0u8; limits.capacity];

    let mut received = match transport.recv(&mut buffer, limits.first_read_timeout) {
        Ok(0) => return Err(ConnectorError::NoReply),
        Ok(count) => count,
        Err(e) => {
            debug!("First read failed: {}", e);
            return Err(ConnectorError::NoReply);
        }
    };

    let frame = parse_reply_frame(&buffer[..received])?;
    let expected = match frame.total_len() {
        Some(expected) if expected < limits.capacity => expected,
        other => {
            return Err(ConnectorError::ReplyTooLarge {
                expected: other.unwrap_or(usize::MAX),
                capacity: limits.capacity,
            });
        }
    };

    while received < expected {
        match transport.recv(&mut buffer[received..expected], limits.read_timeout) {
            Ok(0) => return Err(ConnectorError::IncompleteBody { received, expected }),
            Ok(count) => received += count,
            Err(e) => {
                debug!("Continuation read failed after {} bytes: {}", received, e);
                return Err(ConnectorError::IncompleteBody { received, expected });
            }
        }
    }

    create_response(&buffer[..expected], &frame)
}

/// Implementation of a SOAP client for FlightAxis that uses the TCP protocol.
pub(crate) struct TcpSoapClient {
    simulator_host: String,
    connect_timeout: Duration,
    limits: ReceiveLimits,
    /// Statistics engine for tracking performance
    statistics: Arc<StatisticsEngine>,
}

impl SoapClient for TcpSoapClient {
    /// Sends a SOAP action to the simulator and returns the response.
    ///
    /// # Arguments
    /// * `action` - The SOAP action to send.
    /// * `body`   - The body of the SOAP request.
    fn send_action(&self, action: &str, body: &str) -> Result<SoapResponse, ConnectorError> {
        let envelope = encode_envelope(action, body);
        let request = build_http_request(action, &envelope);

        self.exchange(&request)
            .inspect_err(|e| error!("{} request failed: {}", action, e))
    }
}

impl TcpSoapClient {
    /// Creates a new TCP SOAP client.
    pub fn new(configuration: &Configuration, statistics: Arc<StatisticsEngine>) -> Self {
        TcpSoapClient {
            simulator_host: configuration.simulator_host.clone(),
            connect_timeout: configuration.connect_timeout,
            limits: ReceiveLimits::from(configuration),
            statistics,
        }
    }

    fn exchange(&self, request: &str) -> Result<SoapResponse, ConnectorError> {
        let mut stream = self.connect()?;
        stream.send(request.as_bytes())?;
        self.statistics.record_request();

        receive_reply(&mut stream, &self.limits)
    }

    fn connect(&self) -> Result<TcpStream, ConnectorError> {
        let connect_failed = |source| ConnectorError::ConnectFailed {
            host: self.simulator_host.clone(),
            source,
        };

        let address = self
            .simulator_host
            .to_socket_addrs()
            .map_err(connect_failed)?
            .next()
            .ok_or_else(|| {
                connect_failed(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "host resolved to no addresses",
                ))
            })?;

        let stream =
            TcpStream::connect_timeout(&address, self.connect_timeout).map_err(connect_failed)?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
