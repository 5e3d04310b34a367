//! Provides an implementation of a SOAP client that returns stubbed responses.
//! Useful for testing.
//!
//! Responses are named after files in `testdata/responses`; the trailing
//! `-NNN` of the name is the HTTP status code. The special name `no-reply`
//! simulates a simulator that never answers. The last response is repeated
//! once the queue runs dry.

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::{ConnectorError, StatisticsEngine};

use super::xml::{create_response, parse_reply_frame};
use super::{SoapClient, SoapResponse, encode_envelope};

pub(crate) const NO_REPLY: &str = "no-reply";

pub(crate) struct StubSoapClient {
    responses: Mutex<VecDeque<String>>,
    pub(crate) statistics: Option<Arc<StatisticsEngine>>,
    requests: Mutex<Vec<String>>,
}

impl StubSoapClient {
    pub fn new(responses: Vec<String>) -> Self {
        StubSoapClient {
            responses: Mutex::new(responses.into()),
            statistics: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn add_request(&self, request: &str) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.to_string());
    }

    fn next_response(&self) -> String {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().expect("stub has no responses").clone()
        }
    }
}

impl SoapClient for StubSoapClient {
    fn send_action(&self, action: &str, body: &str) -> Result<SoapResponse, ConnectorError> {
        let envelope = encode_envelope(action, body);

        if let Some(statistics) = &self.statistics {
            statistics.record_request();
        }
        self.add_request(&envelope);

        let response_key = self.next_response();
        if response_key == NO_REPLY {
            return Err(ConnectorError::NoReply);
        }

        let reply = load_response(&response_key);
        let frame = parse_reply_frame(&reply)?;
        create_response(&reply, &frame)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read a canned response body from `testdata/responses`.
fn load_body(response_key: &str) -> String {
    let response_path: PathBuf = [
        env!("CARGO_MANIFEST_DIR"),
        "testdata",
        "responses",
        &format!("{}.xml", response_key),
    ]
    .iter()
    .collect();
    std::fs::read_to_string(&response_path)
        .unwrap_or_else(|e| panic!("failed to read {:?}: {}", response_path, e))
}

/// Wrap a canned response body in the HTTP framing the simulator uses.
pub(crate) fn load_response(response_key: &str) -> Vec<u8> {
    let body = load_body(response_key);
    let code = response_key.rsplit('-').next().unwrap();

    let mut buffer = String::new();
    buffer.push_str(&format!("HTTP/1.1 {} OK\r\n", code));
    buffer.push_str("Server: gSOAP/2.7\r\n");
    buffer.push_str("Content-Type: text/xml; charset=utf-8\r\n");
    buffer.push_str(&format!("Content-Length: {}\r\n", body.len()));
    buffer.push_str("Connection: close\r\n");
    buffer.push_str("\r\n");
    buffer.push_str(&body);

    buffer.into_bytes()
}
