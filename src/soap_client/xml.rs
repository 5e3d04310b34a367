//! Pure functions for SOAP/HTTP request building and response framing.
//! This module does no I/O.

use super::SoapResponse;
use crate::ConnectorError;

/// Size of header for request body
const HEADER_LEN: usize = 120;

/// Separates the HTTP header block from the body.
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Encode a SOAP envelope for FlightAxis
pub(crate) fn encode_envelope(action: &str, body: &str) -> String {
    let mut envelope = String::with_capacity(200 + body.len());

    envelope.push_str("<?xml version='1.0' encoding='UTF-8'?>");
    envelope.push_str("<soap:Envelope xmlns:soap='http://schemas.xmlsoap.org/soap/envelope/' xmlns:xsd='http://www.w3.org/2001/XMLSchema' xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance'>");
    envelope.push_str("<soap:Body>");
    envelope.push_str(&format!("<{}>{}</{}>", action, body, action));
    envelope.push_str("</soap:Body>");
    envelope.push_str("</soap:Envelope>");

    envelope
}

/// Build an HTTP request string for a SOAP action.
///
/// `content-length` is the UTF-8 byte length of the envelope.
pub(crate) fn build_http_request(action: &str, envelope: &str) -> String {
    let mut request = String::with_capacity(HEADER_LEN + envelope.len() + action.len());

    request.push_str("POST / HTTP/1.1\r\n");
    request.push_str(&format!("soapaction: '{}'\r\n", action));
    request.push_str(&format!("content-length: {}\r\n", envelope.len()));
    request.push_str("content-type: text/xml;charset='UTF-8'\r\n");
    request.push_str("Connection: Keep-Alive\r\n");
    request.push_str("\r\n");
    request.push_str(envelope);

    request
}

/// Parse HTTP status line and extract status code
pub(crate) fn parse_status_line(status_line: &str) -> Result<u32, ConnectorError> {
    if status_line.is_empty() {
        return Err(ConnectorError::SoapFault(
            "Empty response from simulator".into(),
        ));
    }

    status_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| {
            ConnectorError::SoapFault("Malformed HTTP status line: missing status code".into())
        })?
        .parse()
        .map_err(|e| ConnectorError::SoapFault(format!("Invalid HTTP status code: {}", e)))
}

/// Extract Content-Length from a header line if present
pub(crate) fn parse_content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case("content-length") {
        value.trim().parse().ok()
    } else {
        None
    }
}

/// Location of the body inside a raw reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplyFrame {
    /// Offset of the first body byte.
    pub body_offset: usize,
    /// Declared body length.
    pub content_length: usize,
}

impl ReplyFrame {
    /// Number of bytes the complete reply occupies, or `None` when the
    /// declared length does not fit in `usize`.
    pub fn total_len(&self) -> Option<usize> {
        self.body_offset.checked_add(self.content_length)
    }
}

/// Locate the header terminator and the declared body length in the
/// bytes received so far.
pub(crate) fn parse_reply_frame(received: &[u8]) -> Result<ReplyFrame, ConnectorError> {
    let separator = find_subsequence(received, HEADER_TERMINATOR);
    let header_block = &received[..separator.unwrap_or(received.len())];

    let content_length = String::from_utf8_lossy(header_block)
        .split("\r\n")
        .find_map(parse_content_length)
        .ok_or(ConnectorError::MissingLengthHeader)?;

    let separator = separator.ok_or(ConnectorError::MissingBodySeparator)?;

    Ok(ReplyFrame {
        body_offset: separator + HEADER_TERMINATOR.len(),
        content_length,
    })
}

/// Create a SoapResponse from a complete raw reply.
pub(crate) fn create_response(
    reply: &[u8],
    frame: &ReplyFrame,
) -> Result<SoapResponse, ConnectorError> {
    let head = String::from_utf8_lossy(&reply[..frame.body_offset]);
    let status_line = head.split("\r\n").next().unwrap_or_default();
    let status_code = parse_status_line(status_line)?;

    let expected = frame.total_len().unwrap_or(usize::MAX);
    let body = reply
        .get(frame.body_offset..expected)
        .ok_or(ConnectorError::IncompleteBody {
            received: reply.len(),
            expected,
        })?;
    Ok(SoapResponse {
        status_code,
        body: String::from_utf8_lossy(body).to_string(),
    })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
