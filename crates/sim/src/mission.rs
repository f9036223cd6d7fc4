//! Mission protocol responder
//!
//! # Upload Flow (GCS → Vehicle)
//!
//! 1. GCS sends MISSION_CLEAR_ALL, vehicle answers MISSION_ACK
//! 2. GCS sends MISSION_COUNT
//! 3. Vehicle requests items one at a time, in `Behavior::request_order`
//!    (ascending when unset), as MISSION_REQUEST_INT or MISSION_REQUEST
//! 4. GCS answers each request with the named item
//! 5. After the last item the vehicle sends MISSION_ACK
//!
//! An item that does not answer the outstanding request aborts the upload
//! with MAV_MISSION_INVALID_SEQUENCE. A MISSION_ITEM outside an upload with
//! `current == 2` is a guided go-to.
//!
//! `Behavior` can replace the first request with an error MISSION_ACK, or
//! withhold the go-to ack or the terminal ack.

use std::collections::VecDeque;

use mavlink::common::{MavMessage, MavMissionResult, MISSION_ITEM_DATA, MISSION_ITEM_INT_DATA};

use crate::telemetry::{build_item_request, build_mission_ack};
use crate::vehicle::{Behavior, VehicleState};

/// `current` value marking a guided go-to item.
const GUIDED_GOTO: u8 = 2;

/// Item as stored by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadedItem {
    pub seq: u16,
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    /// Received as MISSION_ITEM_INT.
    pub int: bool,
}

impl UploadedItem {
    fn from_float(data: &MISSION_ITEM_DATA) -> Self {
        Self {
            seq: data.seq,
            lat: data.x as f64,
            lon: data.y as f64,
            alt: data.z,
            int: false,
        }
    }

    fn from_int(data: &MISSION_ITEM_INT_DATA) -> Self {
        Self {
            seq: data.seq,
            lat: data.x as f64 / 1e7,
            lon: data.y as f64 / 1e7,
            alt: data.z,
            int: true,
        }
    }
}

/// Upload transfer state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading {
        /// Sequence number the vehicle is waiting for
        expected: u16,
        /// Requests still to send after `expected`
        pending: VecDeque<u16>,
    },
}

/// Answers mission messages from the ground station.
#[derive(Debug, Default)]
pub struct MissionResponder {
    state: UploadState,
}

impl MissionResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Messages to send back for `msg`; `gcs` is the sender's (system, component).
    pub fn handle(
        &mut self,
        msg: &MavMessage,
        gcs: (u8, u8),
        state: &mut VehicleState,
        behavior: &Behavior,
    ) -> Vec<MavMessage> {
        match msg {
            MavMessage::MISSION_CLEAR_ALL(_) => {
                tracing::info!("Sim mission cleared");
                state.mission.clear();
                self.state = UploadState::Idle;
                if behavior.ack_clear {
                    vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_ACCEPTED)]
                } else {
                    Vec::new()
                }
            }
            MavMessage::MISSION_COUNT(data) => self.handle_count(data.count, gcs, state, behavior),
            MavMessage::MISSION_ITEM(data) => {
                if self.state == UploadState::Idle && data.current == GUIDED_GOTO {
                    let target = UploadedItem::from_float(data);
                    tracing::info!("Sim flying to ({}, {}, {})", target.lat, target.lon, target.alt);
                    state.goto = Some(target);
                    if !behavior.goto_ack {
                        return Vec::new();
                    }
                    return vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_ACCEPTED)];
                }
                self.handle_item(UploadedItem::from_float(data), gcs, state, behavior)
            }
            MavMessage::MISSION_ITEM_INT(data) => {
                self.handle_item(UploadedItem::from_int(data), gcs, state, behavior)
            }
            _ => Vec::new(),
        }
    }

    fn handle_count(
        &mut self,
        count: u16,
        gcs: (u8, u8),
        state: &mut VehicleState,
        behavior: &Behavior,
    ) -> Vec<MavMessage> {
        tracing::info!("Sim mission upload started: {} items", count);
        state.mission.clear();

        if behavior.silent_on_count {
            tracing::warn!("Sim ignoring MISSION_COUNT");
            self.state = UploadState::Idle;
            return Vec::new();
        }
        if behavior.early_mission_ack {
            tracing::warn!("Sim refusing mission upload");
            self.state = UploadState::Idle;
            return vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_ERROR)];
        }

        let mut pending: VecDeque<u16> = match &behavior.request_order {
            Some(order) => order.iter().copied().collect(),
            None => (0..count).collect(),
        };
        let Some(expected) = pending.pop_front() else {
            self.state = UploadState::Idle;
            return vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_ACCEPTED)];
        };

        self.state = UploadState::Uploading { expected, pending };
        vec![build_item_request(gcs, expected, behavior.request_int)]
    }

    fn handle_item(
        &mut self,
        item: UploadedItem,
        gcs: (u8, u8),
        state: &mut VehicleState,
        behavior: &Behavior,
    ) -> Vec<MavMessage> {
        let UploadState::Uploading { expected, pending } = &mut self.state else {
            tracing::warn!("Sim got mission item {} outside an upload", item.seq);
            return vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_ERROR)];
        };

        if item.seq != *expected {
            tracing::warn!(
                "Waypoint sequence mismatch: expected {}, got {}",
                expected,
                item.seq
            );
            self.state = UploadState::Idle;
            return vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_INVALID_SEQUENCE)];
        }

        tracing::debug!("Sim received mission item {}", item.seq);
        state.mission.push(item);

        match pending.pop_front() {
            Some(next) => {
                *expected = next;
                vec![build_item_request(gcs, next, behavior.request_int)]
            }
            None => {
                tracing::info!("Sim mission upload complete: {} items", state.mission.len());
                self.state = UploadState::Idle;
                if behavior.final_ack {
                    vec![build_mission_ack(gcs, MavMissionResult::MAV_MISSION_ACCEPTED)]
                } else {
                    Vec::new()
                }
            }
        }
    }
}
