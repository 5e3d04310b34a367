//! Telemetry extraction from FlightAxis `ExchangeData` replies.
//!
//! A reply is scanned once into a map of leaf element name to text. Required
//! fields are then read by name, so a missing or reordered element only ever
//! affects the field it belongs to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ConnectorError;

/// Reply elements read on every tick, in the order the simulator emits them.
pub const TELEMETRY_KEYS: [&str; 17] = [
    "m-airspeed-MPS",
    "m-altitudeAGL-MTR",
    "m-pitchRate-DEGpSEC",
    "m-rollRate-DEGpSEC",
    "m-yawRate-DEGpSEC",
    "m-azimuth-DEG",
    "m-inclination-DEG",
    "m-roll-DEG",
    "m-aircraftPositionX-MTR",
    "m-aircraftPositionY-MTR",
    "m-velocityWorldU-MPS",
    "m-velocityWorldV-MPS",
    "m-velocityWorldW-MPS",
    "m-propRPM",
    "m-heliMainRotorRPM",
    "m-batteryVoltage-VOLTS",
    "m-batteryCurrentDraw-AMPS",
];

/// Raw telemetry for one tick, in the simulator's own units and axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub airspeed_mps: f64,
    pub altitude_agl_m: f64,
    pub pitch_rate_deg_per_sec: f64,
    pub roll_rate_deg_per_sec: f64,
    pub yaw_rate_deg_per_sec: f64,
    pub azimuth_deg: f64,
    pub inclination_deg: f64,
    pub roll_deg: f64,
    pub position_x_m: f64,
    pub position_y_m: f64,
    pub velocity_world_u_mps: f64,
    pub velocity_world_v_mps: f64,
    pub velocity_world_w_mps: f64,
    pub prop_rpm: f64,
    pub heli_main_rotor_rpm: f64,
    pub battery_voltage: f64,
    pub battery_current_draw: f64,
}

impl TelemetryRecord {
    /// Read every telemetry field by name. Fails on the first field that is
    /// missing or not a number; nothing is partially filled.
    pub fn from_fields(fields: &ReplyFields) -> Result<Self, ConnectorError> {
        Ok(TelemetryRecord {
            airspeed_mps: fields.get("m-airspeed-MPS")?,
            altitude_agl_m: fields.get("m-altitudeAGL-MTR")?,
            pitch_rate_deg_per_sec: fields.get("m-pitchRate-DEGpSEC")?,
            roll_rate_deg_per_sec: fields.get("m-rollRate-DEGpSEC")?,
            yaw_rate_deg_per_sec: fields.get("m-yawRate-DEGpSEC")?,
            azimuth_deg: fields.get("m-azimuth-DEG")?,
            inclination_deg: fields.get("m-inclination-DEG")?,
            roll_deg: fields.get("m-roll-DEG")?,
            position_x_m: fields.get("m-aircraftPositionX-MTR")?,
            position_y_m: fields.get("m-aircraftPositionY-MTR")?,
            velocity_world_u_mps: fields.get("m-velocityWorldU-MPS")?,
            velocity_world_v_mps: fields.get("m-velocityWorldV-MPS")?,
            velocity_world_w_mps: fields.get("m-velocityWorldW-MPS")?,
            prop_rpm: fields.get("m-propRPM")?,
            heli_main_rotor_rpm: fields.get("m-heliMainRotorRPM")?,
            battery_voltage: fields.get("m-batteryVoltage-VOLTS")?,
            battery_current_draw: fields.get("m-batteryCurrentDraw-AMPS")?,
        })
    }
}

/// Leaf elements of one reply, keyed by element name.
#[derive(Debug, Default)]
pub struct ReplyFields<'a> {
    elements: BTreeMap<&'a str, &'a str>,
}

impl<'a> ReplyFields<'a> {
    pub fn parse(xml: &'a str) -> Self {
        ReplyFields {
            elements: extract_fields(xml),
        }
    }

    /// Raw text of an element, if present.
    pub fn text(&self, key: &str) -> Option<&'a str> {
        self.elements.get(key).copied()
    }

    /// Numeric value of a required element.
    ///
    /// Parsing is locale independent; values are not range checked.
    pub fn get(&self, key: &'static str) -> Result<f64, ConnectorError> {
        let text = self.text(key).ok_or(ConnectorError::MissingKey(key))?;
        text.parse().map_err(|_| ConnectorError::MalformedValue {
            key,
            value: text.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Decode the telemetry carried by an `ExchangeData` reply body.
pub fn decode_telemetry(xml: &str) -> Result<TelemetryRecord, ConnectorError> {
    TelemetryRecord::from_fields(&ReplyFields::parse(xml))
}

/// Scan a document once and collect the text of every leaf element.
///
/// Declarations, comments, self-closing tags and containers are skipped and
/// attributes are ignored. When an element name repeats, the first occurrence wins.
pub fn extract_fields(xml: &str) -> BTreeMap<&str, &str> {
    let mut elements = BTreeMap::new();
    let mut open: Option<&str> = None;
    let mut content_start = 0;
    let mut cursor = 0;

    while let Some(found) = xml[cursor..].find('<') {
        let tag_start = cursor + found;
        let Some(length) = xml[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + length;
        let tag = &xml[tag_start + 1..tag_end];
        cursor = tag_end + 1;

        if tag.starts_with('?') || tag.starts_with('!') || tag.ends_with('/') {
            open = None;
        } else if let Some(name) = tag.strip_prefix('/') {
            if let Some(open_name) = open.take().filter(|open_name| *open_name == name.trim()) {
                elements
                    .entry(open_name)
                    .or_insert_with(|| xml[content_start..tag_start].trim());
            }
        } else {
            open = tag.split_whitespace().next();
            content_start = cursor;
        }
    }

    elements
}

/// Text between the first `<name>` and the following `</name>`.
pub(crate) fn extract_element(name: &str, xml: &str) -> Option<String> {
    let start_tag = &format!("<{}>", name);
    let end_tag = &format!("</{}>", name);

    let start_pos = xml.find(start_tag)?;
    let detail_start = start_pos + start_tag.len();
    let end_pos = detail_start + xml[detail_start..].find(end_tag)?;

    if detail_start >= end_pos {
        return None;
    }

    Some(xml[detail_start..end_pos].to_string())
}
