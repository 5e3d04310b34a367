//! Encoding functions for the FlightAxis protocol.

use std::fmt::Write;

use crate::mixer::{ControlChannels, NUM_CHANNELS};

const CONTROL_INPUTS_CAPACITY: usize = 256;

/// Bit mask selecting every channel that is sent.
const SELECTED_CHANNELS: u32 = (1 << NUM_CHANNELS) - 1;

/// Encodes control channels into the `ExchangeData` payload.
pub(crate) fn encode_control_inputs(channels: &ControlChannels) -> String {
    let mut message = String::with_capacity(CONTROL_INPUTS_CAPACITY);

    message.push_str("<pControlInputs>");
    let _ = write!(
        message,
        "<m-selectedChannels>{}</m-selectedChannels>",
        SELECTED_CHANNELS
    );
    message.push_str("<m-channelValues-0to1>");
    for value in channels.0.iter() {
        let _ = write!(message, "<item>{:.4}</item>", value);
    }
    message.push_str("</m-channelValues-0to1>");
    message.push_str("</pControlInputs>");

    message
}
