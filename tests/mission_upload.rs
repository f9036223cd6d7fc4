//! Mission upload handshake against a simulated vehicle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use flight_link::{
    BroadcastSink, ChannelSink, CommandClient, ErrorKind, LinkConfig, MessageKind, Waypoint,
};
use flight_link_sim::{free_port, Behavior, SimVehicle};
use tokio::sync::broadcast::error::TryRecvError;

fn config() -> LinkConfig {
    LinkConfig::loopback().with_timeout(Duration::from_secs(1))
}

fn spawn(behavior: Behavior) -> (SimVehicle, u16) {
    let port = free_port().unwrap();
    (SimVehicle::spawn(port, behavior).unwrap(), port)
}

fn route() -> Vec<Waypoint> {
    vec![
        Waypoint::new(47.397742, 8.545594, 10.0),
        Waypoint::new(47.398036, 8.546163, 15.0),
        Waypoint::new(47.398240, 8.545050, 20.0),
    ]
}

/// Sink collecting every published payload.
fn recording_sink() -> (Arc<dyn BroadcastSink>, Arc<Mutex<Vec<String>>>) {
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&published);
    let sink: Arc<dyn BroadcastSink> = Arc::new(move |payload: &str| {
        log.lock().unwrap().push(payload.to_string());
    });
    (sink, published)
}

#[test]
fn test_upload_three_waypoints() {
    let (vehicle, port) = spawn(Behavior::default());
    let (sink, published) = recording_sink();
    let client = CommandClient::new(config()).with_sink(sink);

    let ack = client.upload_mission(port, &route()).unwrap();

    assert_eq!(ack.kind(), Some(MessageKind::MissionAck));
    assert_eq!(ack.mission_result(), Some(0));
    assert_eq!(ack.droneid(), Some(port));

    let mission = vehicle.mission();
    assert_eq!(mission.len(), 4);
    for (index, item) in mission.iter().enumerate() {
        assert_eq!(item.seq as usize, index);
        assert!(item.int);
    }
    assert_eq!((mission[0].lat, mission[0].lon, mission[0].alt), (0.0, 0.0, 0.0));
    assert!((mission[3].lat - 47.398240).abs() < 1e-6);
    assert_eq!(mission[3].alt, 20.0);

    assert_eq!(vehicle.received_count("MISSION_CLEAR_ALL"), 1);
    assert_eq!(vehicle.received_count("MISSION_COUNT"), 1);
    assert_eq!(vehicle.received_count("MISSION_ITEM_INT"), 4);

    // Clear response plus one request per item; the final ack is not published.
    let published = published.lock().unwrap();
    assert_eq!(published.len(), 5);
    let clear: serde_json::Value = serde_json::from_str(&published[0]).unwrap();
    assert_eq!(clear["command"], "WAYPOINT_CLEAR_ALL");
    assert_eq!(clear["droneid"], port);
    for payload in &published[1..] {
        let request: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(request["mavpackettype"], "MISSION_REQUEST_INT");
    }
}

#[test]
fn test_upload_empty_route_sends_home_only() {
    let (vehicle, port) = spawn(Behavior::default());

    let ack = CommandClient::new(config())
        .upload_mission(port, &[])
        .unwrap();

    assert_eq!(ack.mission_result(), Some(0));
    let mission = vehicle.mission();
    assert_eq!(mission.len(), 1);
    assert_eq!(mission[0].seq, 0);
}

#[test]
fn test_upload_answers_requests_out_of_order() {
    let (vehicle, port) = spawn(
        Behavior::default()
            .with_request_order(&[2, 0, 3, 1])
            .with_float_requests(),
    );

    CommandClient::new(config())
        .upload_mission(port, &route())
        .unwrap();

    let mission = vehicle.mission();
    let seqs: Vec<u16> = mission.iter().map(|item| item.seq).collect();
    assert_eq!(seqs, vec![2, 0, 3, 1]);
    assert!(mission.iter().all(|item| !item.int));
    assert!((mission[0].lat - 47.398036).abs() < 1e-4);
    assert_eq!(vehicle.received_count("MISSION_ITEM"), 4);
}

#[test]
fn test_upload_publishes_to_channel() {
    let (_vehicle, port) = spawn(Behavior::default());
    let sink = Arc::new(ChannelSink::new(16));
    let mut rx = sink.subscribe();

    CommandClient::new(config())
        .with_sink(sink)
        .upload_mission(port, &route()[..1])
        .unwrap();

    let mut kinds = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(payload) => {
                let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
                kinds.push(value["mavpackettype"].as_str().unwrap().to_string());
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(e) => panic!("unexpected receive error: {e}"),
        }
    }
    assert_eq!(
        kinds,
        vec!["MISSION_ACK", "MISSION_REQUEST_INT", "MISSION_REQUEST_INT"]
    );
}

#[test]
fn test_upload_tolerates_silent_clear() {
    let (vehicle, port) = spawn(Behavior::default().without_clear_ack());

    let ack = CommandClient::new(config())
        .upload_mission(port, &route()[..2])
        .unwrap();

    assert_eq!(ack.mission_result(), Some(0));
    assert_eq!(vehicle.mission().len(), 3);
}

#[test]
fn test_upload_fails_when_count_ignored() {
    let (vehicle, port) = spawn(Behavior::default().with_silent_on_count());

    let err = CommandClient::new(config())
        .upload_mission(port, &route())
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AckTimeout);
    assert!(err.message.starts_with("Set waypoint failed! "));
    assert_eq!(err.droneid.value(), port);
    assert_eq!(err.to_json()["droneid"], port);
    assert_eq!(vehicle.received_count("MISSION_ITEM_INT"), 0);
}

#[test]
fn test_upload_rejects_out_of_range_request() {
    let (vehicle, port) = spawn(Behavior::default().with_request_order(&[0, 9]));

    let err = CommandClient::new(config())
        .upload_mission(port, &route()[..1])
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ProtocolFault);
    assert!(err.message.contains("requested item 9"));
    assert_eq!(vehicle.received_count("MISSION_ITEM_INT"), 1);
}

#[test]
fn test_upload_without_heartbeat_times_out() {
    let (vehicle, port) = spawn(Behavior::default().without_heartbeat());

    let err = CommandClient::new(config())
        .upload_mission(port, &route())
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AckTimeout);
    assert!(err.message.starts_with("Set waypoint failed! "));
    assert!(vehicle.received().is_empty());
}

#[test]
fn test_upload_ends_on_early_mission_ack() {
    let (vehicle, port) = spawn(Behavior::default().with_early_mission_ack());

    let err = CommandClient::new(config())
        .upload_mission(port, &route())
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ProtocolFault);
    assert!(err
        .message
        .starts_with("Set waypoint failed! upload ended before item 1 of 4"));
    assert_eq!(err.droneid.value(), port);
    assert_eq!(vehicle.received_count("MISSION_ITEM_INT"), 0);
}

#[test]
fn test_upload_fails_without_final_ack() {
    let (vehicle, port) = spawn(Behavior::default().without_final_ack());

    let err = CommandClient::new(config())
        .upload_mission(port, &route())
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AckTimeout);
    assert_eq!(
        err.message,
        "Set waypoint failed! no final MISSION_ACK (timeout 1s)"
    );
    assert_eq!(err.droneid.value(), port);
    assert_eq!(vehicle.mission().len(), 4);
}
