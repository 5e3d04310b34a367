use crate::ConnectorError;
use crate::decoders::extract_element;

#[cfg(test)]
pub(crate) mod stub;
pub(crate) mod tcp;
pub(crate) mod xml;

pub(crate) use xml::encode_envelope;

/// Response from a SOAP request to the FlightAxis server
#[derive(Debug)]
pub(crate) struct SoapResponse {
    pub status_code: u32,
    pub body: String,
}

impl SoapResponse {
    /// Extract fault message from a failed SOAP response
    pub fn fault_message(&self) -> String {
        match extract_element("detail", &self.body) {
            Some(message) => message,
            None => "Failed to extract error message".into(),
        }
    }

    /// Body of a successful response, or the fault it carries.
    pub fn into_body(self) -> Result<String, ConnectorError> {
        match self.status_code {
            200 => Ok(self.body),
            _ => Err(ConnectorError::SoapFault(self.fault_message())),
        }
    }
}

impl From<SoapResponse> for Result<(), ConnectorError> {
    fn from(val: SoapResponse) -> Self {
        val.into_body().map(|_| ())
    }
}

/// Trait for sending SOAP requests to the FlightAxis server
pub(crate) trait SoapClient: Send {
    fn send_action(&self, action: &str, body: &str) -> Result<SoapResponse, ConnectorError>;
    #[cfg(test)]
    fn requests(&self) -> Vec<String> {
        Vec::new()
    }
}
