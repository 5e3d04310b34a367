//! End-to-end tests over a real loopback TCP connection.
//!
//! Unit tests live next to the code they cover; these exercise the whole
//! pipeline, from the connector down to the socket, against [`soap_stub::Server`].


use std::net::TcpListener;
use std::time::Duration;

use approx::assert_relative_eq;
use nalgebra::Vector3;

use crate::{ActuatorFrame, Airframe, Configuration, ConnectorError, FlightAxis, Session};
use soap_stub::{NO_REPLY, Server, TRUNCATED};

const HANDSHAKE: [&str; 2] = [
    "restore-original-controller-device-200",
    "inject-uav-controller-interface-200",
];

fn create_configuration(server: &Server) -> Configuration {
    Configuration {
        simulator_host: server.host(),
        connect_timeout: Duration::from_millis(1000),
        ..Default::default()
    }
}

fn start_connected(replies: &[&str]) -> Server {
    let mut responses = HANDSHAKE.to_vec();
    responses.extend_from_slice(replies);
    Server::start(&responses)
}

#[test]
pub fn test_update_over_tcp() {
    // Assemble
    let server = start_connected(&["return-data-200"]);
    let mut axis = FlightAxis::with_configuration(&create_configuration(&server));

    // Act
    let state = *axis.update(&ActuatorFrame::splat(1500)).unwrap();

    // Assert
    assert_eq!(state.position, Vector3::zeros());
    assert_relative_eq!(state.airspeed, 0.040872246, epsilon = 1e-6);
    assert_eq!(axis.session(), Session::Established);

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].contains("<RestoreOriginalControllerDevice>"));
    assert!(requests[1].contains("<InjectUAVControllerInterface>"));
    assert!(requests[2].contains(
        "<m-channelValues-0to1><item>0.5000</item><item>0.5000</item><item>0.5000</item>"
    ));

    let statistics = axis.statistics();
    assert_eq!(statistics.request_count, 3);
    assert_eq!(statistics.error_count, 0);
}

#[test]
pub fn test_position_offset_over_tcp() {
    let server = start_connected(&["return-data-200", "return-data-climb-200"]);
    let mut axis = FlightAxis::with_configuration(&create_configuration(&server));

    axis.update(&ActuatorFrame::splat(1500)).unwrap();
    let state = axis.update(&ActuatorFrame::splat(1500)).unwrap();

    assert_relative_eq!(state.position.x, -3.0, epsilon = 1e-9);
    assert_relative_eq!(state.position.y, 5.0, epsilon = 1e-9);
    assert_relative_eq!(state.position.z, -10.0, epsilon = 1e-9);
}

#[test]
pub fn test_fragmented_reply_is_assembled() {
    let mut responses = HANDSHAKE.to_vec();
    responses.push("return-data-200");
    let server = Server::start_with_fragments(&responses, Some(512));
    let configuration = Configuration {
        airframe: Airframe::Helicopter,
        ..create_configuration(&server)
    };
    let mut axis = FlightAxis::with_configuration(&configuration);

    let telemetry = axis.exchange(&ActuatorFrame::splat(1500)).unwrap();

    assert_relative_eq!(telemetry.battery_voltage, 12.599982261, epsilon = 1e-6);
    assert_relative_eq!(telemetry.position_x_m, 5575.680664062, epsilon = 1e-6);
    assert_eq!(telemetry.heli_main_rotor_rpm, -1.0);
}

#[test]
pub fn test_reset_aircraft_over_tcp() {
    let server = Server::start(&["reset-aircraft-200"]);
    let axis = FlightAxis::with_configuration(&create_configuration(&server));

    axis.reset_aircraft().unwrap();

    assert_eq!(server.request_count(), 1);
    assert!(server.requests()[0].contains("<ResetAircraft></ResetAircraft>"));
}

#[test]
pub fn test_soap_fault_over_tcp() {
    let server = Server::start(&["restore-original-controller-device-500"]);
    let mut axis = FlightAxis::with_configuration(&create_configuration(&server));

    match axis.release_control() {
        Err(ConnectorError::SoapFault(msg)) => {
            assert_eq!(msg, "Pointer to original controller device is null");
        }
        other => panic!("expected SoapFault, got {:?}", other),
    }
}

#[test]
pub fn test_no_reply() {
    let server = start_connected(&["return-data-200", NO_REPLY]);
    let mut axis = FlightAxis::with_configuration(&create_configuration(&server));
    axis.update(&ActuatorFrame::splat(1500)).unwrap();
    let state = *axis.state();

    let result = axis.update(&ActuatorFrame::splat(1500));

    assert!(matches!(result, Err(ConnectorError::NoReply)));
    assert_eq!(axis.state(), &state);
    assert_eq!(axis.statistics().error_count, 1);
}

#[test]
pub fn test_truncated_reply() {
    let truncated = format!("{}return-data-200", TRUNCATED);
    let server = start_connected(&[truncated.as_str()]);
    let mut axis = FlightAxis::with_configuration(&create_configuration(&server));

    match axis.update(&ActuatorFrame::splat(1500)) {
        Err(ConnectorError::IncompleteBody { received, expected }) => {
            assert_eq!(expected - received, 100);
        }
        other => panic!("expected IncompleteBody, got {:?}", other),
    }
}

#[test]
pub fn test_reply_larger_than_capacity() {
    let server = start_connected(&["return-data-200"]);
    let configuration = Configuration {
        reply_capacity: 1024,
        ..create_configuration(&server)
    };
    let mut axis = FlightAxis::with_configuration(&configuration);

    assert!(matches!(
        axis.update(&ActuatorFrame::splat(1500)),
        Err(ConnectorError::ReplyTooLarge { capacity: 1024, .. })
    ));
}

#[test]
pub fn test_connect_failure() {
    // grab a free port, then close it again
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let configuration = Configuration {
        simulator_host: format!("127.0.0.1:{}", port),
        ..Default::default()
    };
    let mut axis = FlightAxis::with_configuration(&configuration);

    let result = axis.update(&ActuatorFrame::splat(1500));

    assert!(matches!(result, Err(ConnectorError::ConnectFailed { .. })));
    // the handshake is attempted and its failure swallowed
    assert_eq!(axis.session(), Session::Established);
    assert_eq!(axis.statistics().error_count, 1);
    assert_eq!(axis.statistics().failures.connection, 1);
    assert_eq!(axis.statistics().request_count, 0);
}
